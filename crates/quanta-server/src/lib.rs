//! # quanta-server
//!
//! HTTP surface of Quanta: chat, session CRUD, health, and a WebSocket
//! feed of each session's new messages, results and progress.
//!
//! Assemble with [`http::router`] and an [`AppState`]:
//!
//! ```rust,ignore
//! let app = quanta_server::http::router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod chat;
pub mod http;
pub mod live;
pub mod service;

pub use service::{ApiError, AppState, Environment};
