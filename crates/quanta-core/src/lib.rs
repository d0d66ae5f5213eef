//! # quanta-core
//!
//! Deterministic domain layer of the Quanta physics research assistant.
//!
//! This crate holds everything that can be decided without I/O:
//! - the entity model (sessions, messages, progress steps, results)
//! - the identifier scheme that separates stored records from
//!   degraded-mode placeholders
//! - input validation (JSON Schema plus typed checks)
//! - heuristic extraction of equations and concepts from model answers
//!
//! ## Example
//!
//! ```rust
//! use quanta_core::{Answer, ChatRequest};
//!
//! let request = ChatRequest::new("Why does F = ma hold?", None).unwrap();
//! let answer = Answer::from_completion("**Analysis**: By Newton, F = ma.");
//!
//! assert_eq!(request.session_id(), None);
//! assert_eq!(answer.equations, vec!["F = ma".to_string()]);
//! ```

pub mod extract;
pub mod ids;
pub mod types;
pub mod validation;

pub use extract::{extract, parse_follow_ups, Answer, Extraction};
pub use ids::{durable_id, is_placeholder_id, placeholder_id};
pub use types::{
    Message, MessageRole, NewMessage, NewProgressStep, NewResult, NewSession, Page,
    ProgressStatus, ProgressStep, ResearchResult, ResultKind, Session, SessionCounts,
    SessionDetail, SessionStatus, SessionSummary, SessionUpdate,
};
pub use validation::{
    ChatRequest, CreateMessageInput, CreateProgressInput, CreateSessionInput, PageRequest,
    UpdateSessionInput, ValidationError,
};
