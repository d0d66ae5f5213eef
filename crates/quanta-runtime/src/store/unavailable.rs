use async_trait::async_trait;

use quanta_core::{
    Message, NewMessage, NewProgressStep, NewResult, NewSession, Page, PageRequest, ProgressStep,
    ResearchResult, Session, SessionDetail, SessionSummary, SessionUpdate,
};

use super::{ResearchStore, StoreError};

/// A store that refuses every call.
///
/// Used when storage is switched off: chat keeps answering with placeholder
/// records and the CRUD routes report the outage.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> Result<T, StoreError> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }
}

impl Default for UnavailableStore {
    fn default() -> Self {
        Self::new("storage is disabled")
    }
}

#[async_trait]
impl ResearchStore for UnavailableStore {
    async fn ensure_session(&self, _draft: NewSession) -> Result<Session, StoreError> {
        self.fail()
    }

    async fn create_session(&self, _draft: NewSession) -> Result<Session, StoreError> {
        self.fail()
    }

    async fn get_session(&self, _id: &str) -> Result<SessionDetail, StoreError> {
        self.fail()
    }

    async fn list_sessions(&self, _page: PageRequest) -> Result<Page<SessionSummary>, StoreError> {
        self.fail()
    }

    async fn update_session(
        &self,
        _id: &str,
        _update: SessionUpdate,
    ) -> Result<Session, StoreError> {
        self.fail()
    }

    async fn delete_session(&self, _id: &str) -> Result<(), StoreError> {
        self.fail()
    }

    async fn create_message(&self, _draft: NewMessage) -> Result<Message, StoreError> {
        self.fail()
    }

    async fn list_messages(
        &self,
        _session_id: Option<&str>,
        _page: PageRequest,
    ) -> Result<Page<Message>, StoreError> {
        self.fail()
    }

    async fn create_progress(&self, _draft: NewProgressStep) -> Result<ProgressStep, StoreError> {
        self.fail()
    }

    async fn list_progress(
        &self,
        _session_id: Option<&str>,
        _page: PageRequest,
    ) -> Result<Page<ProgressStep>, StoreError> {
        self.fail()
    }

    async fn create_result(&self, _draft: NewResult) -> Result<ResearchResult, StoreError> {
        self.fail()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.fail()
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
