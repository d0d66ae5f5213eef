use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use quanta_core::{
    durable_id, Message, NewMessage, NewProgressStep, NewResult, NewSession, Page, PageRequest,
    ProgressStep, ResearchResult, Session, SessionDetail, SessionSummary, SessionUpdate,
};

use super::record::{new_session_id, newest_first, paginate, SessionRecord};
use super::{ResearchStore, StoreError};

/// Directory-backed store: one pretty-printed JSON document per session.
///
/// Writers are serialized through a single async mutex; each document is
/// replaced atomically (write to a temp file, then rename).
pub struct FileStore {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn record_path(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        Self::validate_session_id(session_id)?;
        Ok(self.base_path.join(format!("{}.json", session_id)))
    }

    /// Reject ids that are unsafe as file names.
    fn validate_session_id(session_id: &str) -> Result<(), StoreError> {
        if session_id.is_empty() {
            return Err(StoreError::InvalidId("session id cannot be empty".to_string()));
        }
        if session_id.contains('/')
            || session_id.contains('\\')
            || session_id.contains("..")
            || session_id.starts_with('.')
            || session_id.chars().any(|c| c.is_control())
        {
            return Err(StoreError::InvalidId(format!(
                "session id contains invalid characters: {session_id:?}"
            )));
        }
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let path = self.record_path(session_id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn load_existing(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        self.load(session_id)
            .await?
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))
    }

    async fn load_all(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
                    if !id.starts_with('.') {
                        ids.push(id.to_string());
                    }
                }
            }
        }
        ids.sort();

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.load(&id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        let path = self.record_path(&record.session.id)?;
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp_path = self
            .base_path
            .join(format!(".{}.{}.tmp", record.session.id, durable_id()));

        let write_result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, &path).await
        }
        .await;

        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(e));
        }
        Ok(())
    }

    async fn insert_new(&self, draft: NewSession) -> Result<Session, StoreError> {
        let id = new_session_id(&draft)?;
        if self.load(&id).await?.is_some() {
            return Err(StoreError::InvalidId(format!("session {} already exists", id)));
        }
        let session = Session::from_draft(id, draft);
        self.save(&SessionRecord::new(session.clone())).await?;
        Ok(session)
    }

    /// Load, change and save one session under the write lock.
    async fn modify<T>(
        &self,
        session_id: &str,
        f: impl Send + FnOnce(&mut SessionRecord) -> T,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load_existing(session_id).await?;
        let out = f(&mut record);
        self.save(&record).await?;
        Ok(out)
    }

    async fn collect<T: Clone>(
        &self,
        session_id: Option<&str>,
        children: impl Send + Fn(&SessionRecord) -> &Vec<T>,
    ) -> Result<Vec<T>, StoreError> {
        let records = match session_id {
            Some(id) => self.load(id).await?.into_iter().collect(),
            None => self.load_all().await?,
        };
        Ok(records
            .iter()
            .flat_map(|r| children(r).iter().cloned())
            .collect())
    }
}

#[async_trait]
impl ResearchStore for FileStore {
    async fn ensure_session(&self, draft: NewSession) -> Result<Session, StoreError> {
        let _guard = self.write_lock.lock().await;
        if let Some(id) = &draft.id {
            if let Some(record) = self.load(id).await? {
                return Ok(record.session);
            }
        }
        self.insert_new(draft).await
    }

    async fn create_session(&self, draft: NewSession) -> Result<Session, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.insert_new(draft).await
    }

    async fn get_session(&self, id: &str) -> Result<SessionDetail, StoreError> {
        Ok(self.load_existing(id).await?.detail())
    }

    async fn list_sessions(&self, page: PageRequest) -> Result<Page<SessionSummary>, StoreError> {
        let mut summaries: Vec<SessionSummary> =
            self.load_all().await?.iter().map(SessionRecord::summary).collect();
        newest_first(&mut summaries, |s| s.session.created_at);
        Ok(paginate(summaries, page))
    }

    async fn update_session(
        &self,
        id: &str,
        update: SessionUpdate,
    ) -> Result<Session, StoreError> {
        self.modify(id, |record| {
            update.apply(&mut record.session);
            record.session.clone()
        })
        .await
    }

    async fn delete_session(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.record_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::SessionNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_message(&self, draft: NewMessage) -> Result<Message, StoreError> {
        let session_id = draft.session_id.clone();
        self.modify(&session_id, |record| {
            let message = Message::from_draft(durable_id(), draft);
            record.messages.push(message.clone());
            message
        })
        .await
    }

    async fn list_messages(
        &self,
        session_id: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Message>, StoreError> {
        let mut messages = self.collect(session_id, |r| &r.messages).await?;
        newest_first(&mut messages, |m| m.timestamp);
        Ok(paginate(messages, page))
    }

    async fn create_progress(&self, draft: NewProgressStep) -> Result<ProgressStep, StoreError> {
        let session_id = draft.session_id.clone();
        self.modify(&session_id, |record| {
            let step = ProgressStep::from_draft(durable_id(), draft);
            record.progress.push(step.clone());
            step
        })
        .await
    }

    async fn list_progress(
        &self,
        session_id: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<ProgressStep>, StoreError> {
        let mut steps = self.collect(session_id, |r| &r.progress).await?;
        newest_first(&mut steps, |p| p.timestamp);
        Ok(paginate(steps, page))
    }

    async fn create_result(&self, draft: NewResult) -> Result<ResearchResult, StoreError> {
        let session_id = draft.session_id.clone();
        self.modify(&session_id, |record| {
            let result = ResearchResult::from_draft(durable_id(), draft);
            record.results.push(result.clone());
            result
        })
        .await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        let metadata = tokio::fs::metadata(&self.base_path).await?;
        if metadata.permissions().readonly() {
            return Err(StoreError::Unavailable(format!(
                "{} is read-only",
                self.base_path.display()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}
