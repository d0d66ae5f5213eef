use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use quanta_core::{
    CreateMessageInput, CreateProgressInput, CreateSessionInput, Message, Page, PageRequest,
    ProgressStep, Session, SessionDetail, SessionSummary, UpdateSessionInput,
};
use quanta_runtime::SessionEvent;

use crate::service::{ApiError, AppState};
use crate::{chat, live};

pub const HEALTH_PATH: &str = "/health";
pub const CHAT_PATH: &str = "/chat";
pub const SESSIONS_PATH: &str = "/sessions";
pub const SESSION_PATH: &str = "/sessions/:id";
pub const SESSION_LIVE_PATH: &str = "/sessions/:id/live";
pub const MESSAGES_PATH: &str = "/messages";
pub const PROGRESS_PATH: &str = "/progress";

pub fn health_routes() -> Router<AppState> {
    Router::new().route(HEALTH_PATH, get(health))
}

pub fn chat_routes() -> Router<AppState> {
    Router::new().route(CHAT_PATH, post(chat::chat))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route(SESSIONS_PATH, get(list_sessions).post(create_session))
        .route(
            SESSION_PATH,
            get(get_session).put(update_session).delete(delete_session),
        )
        .route(SESSION_LIVE_PATH, get(live::live))
        .route(MESSAGES_PATH, get(list_messages).post(create_message))
        .route(PROGRESS_PATH, get(list_progress).post(create_progress))
}

/// The full application with request tracing and CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(chat_routes())
        .merge(session_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(st): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match st.store.health_check().await {
        Ok(()) => json!({ "status": "healthy", "store": st.store.name() }),
        Err(e) => {
            tracing::warn!(store = st.store.name(), error = %e, "store health check failed");
            json!({ "status": "unhealthy", "store": st.store.name(), "error": e.to_string() })
        }
    };
    let healthy = database["status"] == "healthy";
    let provider = match &st.chat {
        Some(chat) => json!({ "status": "configured", "name": chat.provider().name() }),
        None => json!({ "status": "unconfigured" }),
    };

    let body = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "timestamp": chrono::Utc::now(),
        "services": {
            "database": database,
            "api": { "status": "healthy" },
            "provider": provider,
        },
        "degradedWrites": st.persistence.degraded_writes(),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": st.environment.as_str(),
    });
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    page: Option<String>,
    limit: Option<String>,
    session_id: Option<String>,
}

impl ListParams {
    fn page_request(&self) -> Result<PageRequest, ApiError> {
        Ok(PageRequest::from_query(
            self.page.as_deref(),
            self.limit.as_deref(),
        )?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    page: u32,
    limit: u32,
    total: usize,
    total_pages: usize,
}

impl Pagination {
    fn new(request: PageRequest, total: usize) -> Self {
        Self {
            page: request.page(),
            limit: request.limit(),
            total,
            total_pages: request.total_pages(total),
        }
    }
}

/// `{ <key>: [...], pagination: {...} }`
fn paged<T: Serialize>(key: &str, request: PageRequest, page: Page<T>) -> Json<Value> {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), json!(page.items));
    body.insert(
        "pagination".to_string(),
        json!(Pagination::new(request, page.total)),
    );
    Json(Value::Object(body))
}

async fn list_sessions(
    State(st): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let request = params.page_request()?;
    let page: Page<SessionSummary> = st
        .store
        .list_sessions(request)
        .await
        .map_err(|e| st.store_error(e))?;
    Ok(paged("sessions", request, page))
}

async fn create_session(
    State(st): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let Json(body) = payload?;
    let input = CreateSessionInput::parse(&body)?;
    let session = st
        .store
        .create_session(input.into_draft())
        .await
        .map_err(|e| st.store_error(e))?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetail>, ApiError> {
    st.store
        .get_session(&id)
        .await
        .map(Json)
        .map_err(|e| st.store_error(e))
}

async fn update_session(
    State(st): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Session>, ApiError> {
    let Json(body) = payload?;
    let input = UpdateSessionInput::parse(&body)?;
    let session = st
        .store
        .update_session(&id, input.into_update())
        .await
        .map_err(|e| st.store_error(e))?;
    st.hub.publish(
        &session.id,
        SessionEvent::SessionUpdated {
            session: session.clone(),
        },
    );
    Ok(Json(session))
}

async fn delete_session(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    st.store
        .delete_session(&id)
        .await
        .map_err(|e| st.store_error(e))?;
    Ok(Json(json!({ "message": "Session deleted successfully" })))
}

async fn list_messages(
    State(st): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let request = params.page_request()?;
    let page: Page<Message> = st
        .store
        .list_messages(params.session_id.as_deref(), request)
        .await
        .map_err(|e| st.store_error(e))?;
    Ok(paged("messages", request, page))
}

async fn create_message(
    State(st): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let Json(body) = payload?;
    let input = CreateMessageInput::parse(&body)?;
    let message = st
        .store
        .create_message(input.into_draft())
        .await
        .map_err(|e| st.store_error(e))?;
    st.hub.publish(
        &message.session_id,
        SessionEvent::MessageCreated {
            message: message.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_progress(
    State(st): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let request = params.page_request()?;
    let page: Page<ProgressStep> = st
        .store
        .list_progress(params.session_id.as_deref(), request)
        .await
        .map_err(|e| st.store_error(e))?;
    Ok(paged("progress", request, page))
}

async fn create_progress(
    State(st): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ProgressStep>), ApiError> {
    let Json(body) = payload?;
    let input = CreateProgressInput::parse(&body)?;
    let step = st
        .store
        .create_progress(input.into_draft())
        .await
        .map_err(|e| st.store_error(e))?;
    st.hub.publish(
        &step.session_id,
        SessionEvent::ProgressUpdated {
            progress: step.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(step)))
}
