//! JSON Schema validation for request bodies.
//!
//! All input schemas live in `schemas/inputs.schema.json`, keyed by
//! [`InputSchema::key`]. They are compiled once and reused.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::Value;

use super::ValidationError;

/// Embedded input schemas (loaded at compile time).
const INPUT_SCHEMAS_JSON: &str = include_str!("../../schemas/inputs.schema.json");

/// Compiled validators keyed by schema name (initialized once, reused).
static COMPILED: OnceLock<Result<HashMap<&'static str, jsonschema::Validator>, String>> =
    OnceLock::new();

/// The request bodies that have a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSchema {
    ChatRequest,
    CreateSession,
    UpdateSession,
    CreateMessage,
    CreateProgress,
}

impl InputSchema {
    pub const ALL: [InputSchema; 5] = [
        InputSchema::ChatRequest,
        InputSchema::CreateSession,
        InputSchema::UpdateSession,
        InputSchema::CreateMessage,
        InputSchema::CreateProgress,
    ];

    /// Key of this schema in the embedded document.
    pub fn key(self) -> &'static str {
        match self {
            InputSchema::ChatRequest => "chatRequest",
            InputSchema::CreateSession => "createSession",
            InputSchema::UpdateSession => "updateSession",
            InputSchema::CreateMessage => "createMessage",
            InputSchema::CreateProgress => "createProgress",
        }
    }
}

fn compile_all() -> Result<HashMap<&'static str, jsonschema::Validator>, String> {
    let document: Value = serde_json::from_str(INPUT_SCHEMAS_JSON)
        .map_err(|e| format!("Invalid schema JSON: {}", e))?;

    let mut validators = HashMap::new();
    for schema in InputSchema::ALL {
        let key = schema.key();
        let definition = document
            .get(key)
            .ok_or_else(|| format!("Schema '{}' is missing", key))?;
        let validator = jsonschema::options()
            .build(definition)
            .map_err(|e| format!("Failed to compile schema '{}': {}", key, e))?;
        validators.insert(key, validator);
    }
    Ok(validators)
}

fn validator(schema: InputSchema) -> Result<&'static jsonschema::Validator, ValidationError> {
    let compiled = COMPILED
        .get_or_init(compile_all)
        .as_ref()
        .map_err(|e| ValidationError::SchemaUnavailable(e.clone()))?;

    compiled
        .get(schema.key())
        .ok_or_else(|| ValidationError::SchemaUnavailable(schema.key().to_string()))
}

/// Validate a JSON body against one of the input schemas.
///
/// All violations are collected, not just the first.
pub fn validate_input(schema: InputSchema, body: &Value) -> Result<(), ValidationError> {
    let validator = validator(schema)?;

    let violations: Vec<String> = validator
        .iter_errors(body)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{} at {}", e, path)
            }
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Schema(violations))
    }
}
