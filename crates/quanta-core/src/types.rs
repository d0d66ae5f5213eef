//! Entity types shared by every Quanta crate.
//!
//! Entities are plain values. Stores and the placeholder path both build
//! them through the `from_draft` constructors, which is what keeps a
//! durable record and its degraded-mode stand-in structurally identical.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids;

/// Lifecycle status of a research session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Paused,
    Failed,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
}

/// Status of a progress step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Kind of research result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Equation,
    Graph,
    Text,
    Citation,
    Calculation,
    #[serde(alias = "physics_analysis")]
    Analysis,
}

/// A logical conversation grouping messages, progress and results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a session.
///
/// `id` is only set when a caller already holds an identifier and wants the
/// store to upsert it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub id: Option<String>,
    pub title: String,
    pub status: SessionStatus,
}

impl NewSession {
    /// An active session with the given title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            status: SessionStatus::Active,
        }
    }

    /// Pin the identifier the session must be stored under.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl Session {
    /// Materialize a draft under the given identifier.
    pub fn from_draft(id: impl Into<String>, draft: NewSession) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: draft.title,
            status: draft.status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stand-in used when the session could not be stored.
    ///
    /// A caller-supplied id is kept as is; otherwise a placeholder id is minted.
    pub fn placeholder(draft: NewSession) -> Self {
        let id = draft
            .id
            .clone()
            .unwrap_or_else(|| ids::placeholder_id("session"));
        Self::from_draft(id, draft)
    }
}

/// Partial update of a session.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

impl SessionUpdate {
    /// Apply the update in place and bump `updated_at`.
    pub fn apply(&self, session: &mut Session) {
        if let Some(title) = &self.title {
            session.title = title.clone();
        }
        if let Some(status) = self.status {
            session.status = status;
        }
        session.updated_at = Utc::now();
    }
}

/// A chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
}

impl NewMessage {
    pub fn user(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn agent(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            role: MessageRole::Agent,
            content: content.into(),
        }
    }
}

impl Message {
    pub fn from_draft(id: impl Into<String>, draft: NewMessage) -> Self {
        Self {
            id: id.into(),
            session_id: draft.session_id,
            role: draft.role,
            content: draft.content,
            timestamp: Utc::now(),
        }
    }

    pub fn placeholder(draft: NewMessage) -> Self {
        Self::from_draft(ids::placeholder_id("message"), draft)
    }
}

/// A step of visible research progress within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStep {
    pub id: String,
    pub session_id: String,
    pub title: String,
    pub description: String,
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProgressStep {
    pub session_id: String,
    pub title: String,
    pub description: String,
    pub status: ProgressStatus,
    pub details: Option<String>,
}

impl ProgressStep {
    pub fn from_draft(id: impl Into<String>, draft: NewProgressStep) -> Self {
        Self {
            id: id.into(),
            session_id: draft.session_id,
            title: draft.title,
            description: draft.description,
            status: draft.status,
            details: draft.details,
            timestamp: Utc::now(),
        }
    }
}

/// An artifact produced while answering: an analysis, an equation, a citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    pub id: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewResult {
    pub session_id: String,
    pub kind: ResultKind,
    pub title: String,
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl ResearchResult {
    pub fn from_draft(id: impl Into<String>, draft: NewResult) -> Self {
        Self {
            id: id.into(),
            session_id: draft.session_id,
            kind: draft.kind,
            title: draft.title,
            content: draft.content,
            metadata: draft.metadata,
            timestamp: Utc::now(),
        }
    }

    pub fn placeholder(draft: NewResult) -> Self {
        Self::from_draft(ids::placeholder_id("result"), draft)
    }
}

/// Number of children a session owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounts {
    pub messages: usize,
    pub progress: usize,
    pub results: usize,
}

/// A session as shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: Session,
    pub counts: SessionCounts,
}

/// A session with all of its children.
///
/// Messages and progress are oldest first, results newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub messages: Vec<Message>,
    pub progress: Vec<ProgressStep>,
    pub results: Vec<ResearchResult>,
}

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_session_keeps_supplied_id() {
        let session = Session::placeholder(NewSession::titled("Optics").with_id("abc"));
        assert_eq!(session.id, "abc");
        assert!(!ids::is_placeholder_id(&session.id));
    }

    #[test]
    fn test_placeholder_session_mints_id() {
        let session = Session::placeholder(NewSession::titled("Optics"));
        assert!(ids::is_placeholder_id(&session.id));
        assert_eq!(session.status, SessionStatus::Active);
    }

    #[test]
    fn test_message_wire_shape() {
        let msg = Message::from_draft("m1", NewMessage::user("s1", "hello"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "user");
        assert_eq!(json["sessionId"], "s1");
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_result_kind_accepts_legacy_name() {
        let kind: ResultKind = serde_json::from_str("\"physics_analysis\"").unwrap();
        assert_eq!(kind, ResultKind::Analysis);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"analysis\"");
    }

    #[test]
    fn test_progress_status_is_snake_case() {
        let json = serde_json::to_string(&ProgressStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_session_update_applies_fields() {
        let mut session = Session::from_draft("s1", NewSession::titled("Old"));
        let before = session.updated_at;
        SessionUpdate {
            title: Some("New".into()),
            status: Some(SessionStatus::Paused),
        }
        .apply(&mut session);
        assert_eq!(session.title, "New");
        assert_eq!(session.status, SessionStatus::Paused);
        assert!(session.updated_at >= before);
    }

    #[test]
    fn test_summary_flattens_session() {
        let summary = SessionSummary {
            session: Session::from_draft("s1", NewSession::titled("Title")),
            counts: SessionCounts {
                messages: 2,
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["id"], "s1");
        assert_eq!(json["counts"]["messages"], 2);
    }
}
