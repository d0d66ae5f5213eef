//! # quanta-runtime
//!
//! Everything in Quanta that does I/O: LLM providers, retry and fallback
//! resilience, research stores, live session events and the chat
//! orchestrator that ties them together.
//!
//! Decisions about text (validation, extraction) live in `quanta-core`;
//! this crate only decides when to call out, how long to wait, and what to
//! do when a call fails.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quanta_core::ChatRequest;
//! use quanta_runtime::{ChatOrchestratorBuilder, MemoryStore, OpenAiProvider};
//!
//! let chat = ChatOrchestratorBuilder::new()
//!     .provider(Arc::new(OpenAiProvider::new(api_key)?))
//!     .store(Arc::new(MemoryStore::new()))
//!     .build()?;
//!
//! let request = ChatRequest::new("What is the escape velocity of Earth?", None)?;
//! let response = chat.chat(&request).await?;
//! println!("{}", response.response);
//! ```

pub mod config;
pub mod events;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod store;

pub use config::{ConfigError, FollowUpConfig, ProviderSettings, RuntimeConfig};
pub use events::{EventHub, SessionEvent};
pub use orchestrator::{ChatError, ChatOrchestrator, ChatOrchestratorBuilder, ChatResponse};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderRegistry,
};
pub use resilience::{Persisted, ResilientPersistence, RetryPolicy, Retryable, WriteSource};
pub use store::{FileStore, MemoryStore, ResearchStore, StoreError, UnavailableStore};

#[cfg(feature = "openai")]
pub use providers::OpenAiProvider;
