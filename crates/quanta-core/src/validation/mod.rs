//! Input validation.
//!
//! Every inbound body goes through two gates: the JSON Schema for its shape
//! ([`schema`]), then a typed parse with the semantic checks a schema cannot
//! express (a message made only of whitespace, for instance). Both gates
//! report through [`ValidationError`].

mod inputs;
pub mod schema;

pub use inputs::{
    ChatRequest, CreateMessageInput, CreateProgressInput, CreateSessionInput, PageRequest,
    UpdateSessionInput, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
pub use schema::{validate_input, InputSchema};

use thiserror::Error;

/// Errors from input validation. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid input: {}", .0.join("; "))]
    Schema(Vec<String>),

    #[error("{field} must not be blank")]
    Blank { field: &'static str },

    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Input schema unavailable: {0}")]
    SchemaUnavailable(String),
}

impl ValidationError {
    /// Human-readable violations, one per entry.
    pub fn violations(&self) -> Vec<String> {
        match self {
            ValidationError::Schema(violations) => violations.clone(),
            other => vec![other.to_string()],
        }
    }
}
