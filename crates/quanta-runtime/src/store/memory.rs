use async_trait::async_trait;
use parking_lot::RwLock;

use quanta_core::{
    durable_id, Message, NewMessage, NewProgressStep, NewResult, NewSession, Page, PageRequest,
    ProgressStep, ResearchResult, Session, SessionDetail, SessionSummary, SessionUpdate,
};

use super::record::{new_session_id, newest_first, paginate, SessionRecord};
use super::{ResearchStore, StoreError};

/// In-process store for development and tests. Contents die with the process.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_locked(
        records: &mut Vec<SessionRecord>,
        draft: NewSession,
    ) -> Result<Session, StoreError> {
        let id = new_session_id(&draft)?;
        if records.iter().any(|r| r.session.id == id) {
            return Err(StoreError::InvalidId(format!("session {} already exists", id)));
        }
        let session = Session::from_draft(id, draft);
        records.push(SessionRecord::new(session.clone()));
        Ok(session)
    }

    fn with_record<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionRecord) -> T,
    ) -> Result<T, StoreError> {
        let mut records = self.records.write();
        records
            .iter_mut()
            .find(|r| r.session.id == session_id)
            .map(f)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))
    }

    fn collect<T: Clone>(
        &self,
        session_id: Option<&str>,
        children: impl Fn(&SessionRecord) -> &Vec<T>,
    ) -> Vec<T> {
        self.records
            .read()
            .iter()
            .filter(|r| session_id.map_or(true, |id| r.session.id == id))
            .flat_map(|r| children(r).iter().cloned())
            .collect()
    }
}

#[async_trait]
impl ResearchStore for MemoryStore {
    async fn ensure_session(&self, draft: NewSession) -> Result<Session, StoreError> {
        let mut records = self.records.write();
        if let Some(id) = &draft.id {
            if let Some(record) = records.iter().find(|r| &r.session.id == id) {
                return Ok(record.session.clone());
            }
        }
        Self::insert_locked(&mut records, draft)
    }

    async fn create_session(&self, draft: NewSession) -> Result<Session, StoreError> {
        Self::insert_locked(&mut self.records.write(), draft)
    }

    async fn get_session(&self, id: &str) -> Result<SessionDetail, StoreError> {
        self.with_record(id, |record| record.detail())
    }

    async fn list_sessions(&self, page: PageRequest) -> Result<Page<SessionSummary>, StoreError> {
        let mut summaries: Vec<SessionSummary> =
            self.records.read().iter().map(SessionRecord::summary).collect();
        newest_first(&mut summaries, |s| s.session.created_at);
        Ok(paginate(summaries, page))
    }

    async fn update_session(
        &self,
        id: &str,
        update: SessionUpdate,
    ) -> Result<Session, StoreError> {
        self.with_record(id, |record| {
            update.apply(&mut record.session);
            record.session.clone()
        })
    }

    async fn delete_session(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.session.id != id);
        if records.len() == before {
            return Err(StoreError::SessionNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn create_message(&self, draft: NewMessage) -> Result<Message, StoreError> {
        let session_id = draft.session_id.clone();
        self.with_record(&session_id, |record| {
            let message = Message::from_draft(durable_id(), draft);
            record.messages.push(message.clone());
            message
        })
    }

    async fn list_messages(
        &self,
        session_id: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Message>, StoreError> {
        let mut messages = self.collect(session_id, |r| &r.messages);
        newest_first(&mut messages, |m| m.timestamp);
        Ok(paginate(messages, page))
    }

    async fn create_progress(&self, draft: NewProgressStep) -> Result<ProgressStep, StoreError> {
        let session_id = draft.session_id.clone();
        self.with_record(&session_id, |record| {
            let step = ProgressStep::from_draft(durable_id(), draft);
            record.progress.push(step.clone());
            step
        })
    }

    async fn list_progress(
        &self,
        session_id: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<ProgressStep>, StoreError> {
        let mut steps = self.collect(session_id, |r| &r.progress);
        newest_first(&mut steps, |p| p.timestamp);
        Ok(paginate(steps, page))
    }

    async fn create_result(&self, draft: NewResult) -> Result<ResearchResult, StoreError> {
        let session_id = draft.session_id.clone();
        self.with_record(&session_id, |record| {
            let result = ResearchResult::from_draft(durable_id(), draft);
            record.results.push(result.clone());
            result
        })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
