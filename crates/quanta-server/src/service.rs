use std::fmt::Display;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use quanta_core::ValidationError;
use quanta_runtime::{
    ChatError, ChatOrchestrator, EventHub, ResearchStore, ResilientPersistence, StoreError,
};

/// Seconds a client is told to wait when the provider gave no hint.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Deployment mode. Development exposes internal error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    /// `None` when no provider could be configured; chat then answers 503
    pub chat: Option<Arc<ChatOrchestrator>>,
    pub store: Arc<dyn ResearchStore>,
    pub hub: Arc<EventHub>,
    pub persistence: ResilientPersistence,
    pub environment: Environment,
}

impl AppState {
    /// Internal failure, with detail only in development.
    pub fn internal(&self, err: impl Display) -> ApiError {
        tracing::error!(error = %err, "request failed");
        ApiError::Internal {
            detail: (self.environment == Environment::Development).then(|| err.to_string()),
        }
    }

    pub fn store_error(&self, err: StoreError) -> ApiError {
        match err {
            StoreError::SessionNotFound(id) => ApiError::NotFound(format!("session {}", id)),
            StoreError::InvalidId(reason) => ApiError::InvalidInput(vec![reason]),
            other => self.internal(other),
        }
    }

    pub fn chat_error(&self, err: ChatError) -> ApiError {
        if err.is_rate_limit() {
            tracing::warn!(error = %err, "rate limit persisted through every retry");
            return ApiError::RateLimited {
                retry_after: err
                    .retry_after()
                    .map_or(DEFAULT_RETRY_AFTER_SECS, |d| d.as_secs().max(1)),
            };
        }
        if err.is_unconfigured() {
            tracing::warn!(error = %err, "chat requested without a provider");
            return ApiError::ProviderUnconfigured;
        }
        if err.is_configuration() {
            tracing::error!(error = %err, "provider rejected its configuration");
            return ApiError::ProviderConfiguration;
        }
        self.internal(err)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid input")]
    InvalidInput(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Please try again in a few moments.")]
    RateLimited { retry_after: u64 },

    #[error("No language model provider is configured")]
    ProviderUnconfigured,

    #[error("Language model provider configuration error. Check the API key.")]
    ProviderConfiguration,

    #[error("Failed to process the request. Please try again.")]
    Internal { detail: Option<String> },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ProviderUnconfigured => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::ProviderConfiguration | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::NotFound(_) => "not_found",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::ProviderUnconfigured => "provider_unconfigured",
            ApiError::ProviderConfiguration => "provider_configuration",
            ApiError::Internal { .. } => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        match &self {
            ApiError::InvalidInput(violations) => body["details"] = json!(violations),
            ApiError::RateLimited { retry_after } => body["retryAfter"] = json!(retry_after),
            ApiError::Internal {
                detail: Some(detail),
            } => body["details"] = Value::String(detail.clone()),
            _ => {}
        }
        (self.status(), Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::InvalidInput(e.violations())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::InvalidInput(vec![e.body_text()])
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::InvalidInput(vec![e.body_text()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use quanta_runtime::{ProviderError, UnavailableStore};

    fn state(environment: Environment) -> AppState {
        AppState {
            chat: None,
            store: Arc::new(UnavailableStore::default()),
            hub: Arc::new(EventHub::new()),
            persistence: ResilientPersistence::new(),
            environment,
        }
    }

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_internal_detail_hidden_in_production() {
        let (status, body) = body_of(state(Environment::Production).internal("disk on fire")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "internal");
        assert!(body.get("details").is_none());

        let (_, body) = body_of(state(Environment::Development).internal("disk on fire")).await;
        assert_eq!(body["details"], "disk on fire");
    }

    #[tokio::test]
    async fn test_rate_limit_body() {
        let (status, body) = body_of(ApiError::RateLimited { retry_after: 60 }).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["retryAfter"], 60);
        assert_eq!(body["code"], "rate_limited");
    }

    #[test]
    fn test_store_error_mapping() {
        let st = state(Environment::Production);
        assert_eq!(
            st.store_error(StoreError::SessionNotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            st.store_error(StoreError::Unavailable("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_provider_configuration_errors() {
        let st = state(Environment::Production);

        let (status, body) = body_of(st.chat_error(ProviderError::AuthError.into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "provider_configuration");

        let missing = ProviderError::NotConfigured("OPENAI_API_KEY is not set".into());
        let (status, body) = body_of(st.chat_error(missing.into())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "provider_unconfigured");

        let (status, _) = body_of(st.chat_error(ChatError::NotConfigured("none".into()))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_validation_errors_are_bad_requests() {
        let err: ApiError = ValidationError::Blank { field: "message" }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_input");
    }
}
