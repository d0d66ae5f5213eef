use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::schema::{validate_input, InputSchema};
use super::ValidationError;
use crate::types::{
    MessageRole, NewMessage, NewProgressStep, NewSession, ProgressStatus, SessionStatus,
    SessionUpdate,
};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

fn parse_body<T: DeserializeOwned>(schema: InputSchema, body: &Value) -> Result<T, ValidationError> {
    validate_input(schema, body)?;
    serde_json::from_value(body.clone()).map_err(|e| ValidationError::Malformed(e.to_string()))
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Blank { field })
    } else {
        Ok(())
    }
}

/// A validated chat request.
///
/// Only constructible through [`ChatRequest::new`] or [`ChatRequest::parse`],
/// so holding one means the message is non-blank and the session id, if
/// any, is non-blank too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    message: String,
    session_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequestBody {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(
        message: impl Into<String>,
        session_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let message = message.into();
        require_text("message", &message)?;
        if let Some(id) = &session_id {
            require_text("sessionId", id)?;
        }
        Ok(Self {
            message,
            session_id,
        })
    }

    /// Validate a raw JSON body.
    pub fn parse(body: &Value) -> Result<Self, ValidationError> {
        let body: ChatRequestBody = parse_body(InputSchema::ChatRequest, body)?;
        Self::new(body.message, body.session_id)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

/// Body of `POST /sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateSessionInput {
    pub title: String,
    #[serde(default)]
    pub status: SessionStatus,
}

impl CreateSessionInput {
    pub fn parse(body: &Value) -> Result<Self, ValidationError> {
        let input: Self = parse_body(InputSchema::CreateSession, body)?;
        require_text("title", &input.title)?;
        Ok(input)
    }

    pub fn into_draft(self) -> NewSession {
        NewSession {
            id: None,
            title: self.title,
            status: self.status,
        }
    }
}

/// Body of `PUT /sessions/:id`. Both fields optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateSessionInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

impl UpdateSessionInput {
    pub fn parse(body: &Value) -> Result<Self, ValidationError> {
        let input: Self = parse_body(InputSchema::UpdateSession, body)?;
        if let Some(title) = &input.title {
            require_text("title", title)?;
        }
        Ok(input)
    }

    pub fn into_update(self) -> SessionUpdate {
        SessionUpdate {
            title: self.title,
            status: self.status,
        }
    }
}

/// Body of `POST /messages`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageInput {
    pub session_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub role: MessageRole,
}

impl CreateMessageInput {
    pub fn parse(body: &Value) -> Result<Self, ValidationError> {
        let input: Self = parse_body(InputSchema::CreateMessage, body)?;
        require_text("sessionId", &input.session_id)?;
        require_text("content", &input.content)?;
        Ok(input)
    }

    pub fn into_draft(self) -> NewMessage {
        NewMessage {
            session_id: self.session_id,
            role: self.role,
            content: self.content,
        }
    }
}

/// Body of `POST /progress`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProgressInput {
    pub session_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: ProgressStatus,
    #[serde(default)]
    pub details: Option<String>,
}

impl CreateProgressInput {
    pub fn parse(body: &Value) -> Result<Self, ValidationError> {
        let input: Self = parse_body(InputSchema::CreateProgress, body)?;
        require_text("sessionId", &input.session_id)?;
        require_text("title", &input.title)?;
        require_text("description", &input.description)?;
        Ok(input)
    }

    pub fn into_draft(self) -> NewProgressStep {
        NewProgressStep {
            session_id: self.session_id,
            title: self.title,
            description: self.description,
            status: self.status,
            details: self.details,
        }
    }
}

/// Validated pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Result<Self, ValidationError> {
        if page < 1 {
            return Err(ValidationError::OutOfRange {
                field: "page",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(ValidationError::OutOfRange {
                field: "limit",
                reason: format!("must be between 1 and {}", MAX_PAGE_LIMIT),
            });
        }
        Ok(Self { page, limit })
    }

    /// Parse raw query-string values, applying defaults for missing ones.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Result<Self, ValidationError> {
        let page = parse_number("page", page, 1)?;
        let limit = parse_number("limit", limit, DEFAULT_PAGE_LIMIT)?;
        Self::new(page, limit)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of items to skip.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }

    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.limit as usize)
    }
}

fn parse_number(field: &'static str, raw: Option<&str>, default: u32) -> Result<u32, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => raw.parse::<u32>().map_err(|_| ValidationError::OutOfRange {
            field,
            reason: format!("'{}' is not a positive integer", raw),
        }),
    }
}
