//! Research stores: where sessions and their children live.
//!
//! A session owns its messages, progress steps and results, so every
//! backend keeps them together in one [`record::SessionRecord`] and deleting
//! a session deletes its children.

use async_trait::async_trait;
use thiserror::Error;

use quanta_core::{
    Message, NewMessage, NewProgressStep, NewResult, NewSession, Page, PageRequest,
    ProgressStep, ResearchResult, Session, SessionDetail, SessionSummary, SessionUpdate,
};

mod file;
mod memory;
mod record;
mod unavailable;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use unavailable::UnavailableStore;

/// Errors from research stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::SessionNotFound(_))
    }
}

/// Durable storage for research sessions.
///
/// Listings are newest first. Inside a [`SessionDetail`], messages and
/// progress are oldest first and results newest first.
#[async_trait]
pub trait ResearchStore: Send + Sync {
    /// Return the session stored under `draft.id`, creating it with that id
    /// if absent. Without an id this is [`ResearchStore::create_session`].
    async fn ensure_session(&self, draft: NewSession) -> Result<Session, StoreError>;

    /// Create a session under a fresh id (or `draft.id` when given).
    async fn create_session(&self, draft: NewSession) -> Result<Session, StoreError>;

    async fn get_session(&self, id: &str) -> Result<SessionDetail, StoreError>;

    async fn list_sessions(&self, page: PageRequest) -> Result<Page<SessionSummary>, StoreError>;

    async fn update_session(&self, id: &str, update: SessionUpdate)
        -> Result<Session, StoreError>;

    /// Delete a session and everything it owns.
    async fn delete_session(&self, id: &str) -> Result<(), StoreError>;

    /// Fails with [`StoreError::SessionNotFound`] when the session is missing.
    async fn create_message(&self, draft: NewMessage) -> Result<Message, StoreError>;

    async fn list_messages(
        &self,
        session_id: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Message>, StoreError>;

    async fn create_progress(&self, draft: NewProgressStep) -> Result<ProgressStep, StoreError>;

    async fn list_progress(
        &self,
        session_id: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<ProgressStep>, StoreError>;

    async fn create_result(&self, draft: NewResult) -> Result<ResearchResult, StoreError>;

    /// Ok when the store can serve requests.
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Backend name for logs and health reports.
    fn name(&self) -> &str;
}
