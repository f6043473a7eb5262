//! HTTP route handlers for the FireflyChat local API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::chat::{ChatError, ChatMessage, SessionMeta};

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/{id}", delete(delete_session))
        .route("/api/sessions/{id}/messages", get(load_session))
        .route("/api/sessions/{id}/title", put(rename_session))
        .route("/api/chat", post(send_message))
        .fallback_service(ServeDir::new("static"))
        .with_state(state)
}

/// Map a service error to an HTTP error response.
fn service_error(err: &ChatError) -> (StatusCode, String) {
    match err {
        ChatError::SessionNotFound(id) => {
            (StatusCode::NOT_FOUND, format!("session {id} not found"))
        }
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "firefly-chat",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// New-session response.
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    /// Identifier of the created session.
    pub session_id: i64,
}

/// Create a new session and make it active.
async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CreateSessionResponse>, (StatusCode, String)> {
    let session_id = state
        .service
        .create_session()
        .await
        .map_err(|e| service_error(&e))?;
    state.set_active_session(session_id).await;
    Ok(Json(CreateSessionResponse { session_id }))
}

/// List all sessions, most recently updated first.
async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SessionMeta>>, (StatusCode, String)> {
    let sessions = state
        .service
        .list_sessions()
        .await
        .map_err(|e| service_error(&e))?;
    Ok(Json(sessions))
}

/// Load the ordered history of a session and make it active.
async fn load_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ChatMessage>>, (StatusCode, String)> {
    let messages = state
        .service
        .load_session(id)
        .await
        .map_err(|e| service_error(&e))?;
    state.set_active_session(id).await;
    Ok(Json(messages))
}

/// Deletion response.
#[derive(Debug, Serialize)]
pub struct DeleteSessionResponse {
    /// Whether a session was removed.
    pub success: bool,
}

/// Delete a session; clears the active pointer if it was the current one.
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteSessionResponse>, (StatusCode, String)> {
    let success = state
        .service
        .delete_session(id)
        .await
        .map_err(|e| service_error(&e))?;
    if success {
        state.clear_if_active(id).await;
    }
    Ok(Json(DeleteSessionResponse { success }))
}

/// Rename request.
#[derive(Debug, Deserialize)]
pub struct RenameSessionRequest {
    /// New display title.
    pub title: String,
}

/// Rename response: structured success/failure so the UI can render a toast
/// without a stack trace.
#[derive(Debug, Serialize)]
pub struct RenameSessionResponse {
    /// Whether the rename took effect.
    pub success: bool,
    /// The title now in effect, on success.
    pub title: Option<String>,
    /// Failure description, on failure.
    pub error: Option<String>,
}

/// Rename a session.
async fn rename_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<RenameSessionRequest>,
) -> Result<Json<RenameSessionResponse>, (StatusCode, String)> {
    let renamed = state
        .service
        .rename_session(id, &request.title)
        .await
        .map_err(|e| service_error(&e))?;
    let response = if renamed {
        RenameSessionResponse {
            success: true,
            title: Some(request.title),
            error: None,
        }
    } else {
        RenameSessionResponse {
            success: false,
            title: None,
            error: Some(format!("session {id} not found")),
        }
    };
    Ok(Json(response))
}

/// Message-send request.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// User message text.
    pub message: String,
    /// Target session. Falls back to the active session, then to an
    /// implicitly created one.
    pub session_id: Option<i64>,
}

/// Message-send response. A completion failure arrives here as `error` with
/// HTTP 200: the user message is already persisted and the UI must keep
/// running.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// Session the message belongs to.
    pub session_id: i64,
    /// Assistant reply, on success.
    pub reply: Option<String>,
    /// Completion failure description, on failure.
    pub error: Option<String>,
}

/// Send a user message and return the assistant reply.
async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, (StatusCode, String)> {
    let target = match request.session_id {
        Some(id) => Some(id),
        None => state.active_session().await,
    };

    match state.service.send_message(target, &request.message).await {
        Ok(outcome) => {
            state.set_active_session(outcome.session_id).await;
            Ok(Json(SendMessageResponse {
                session_id: outcome.session_id,
                reply: Some(outcome.reply),
                error: None,
            }))
        }
        Err(ChatError::CompletionFailed { session_id, source }) => {
            state.set_active_session(session_id).await;
            Ok(Json(SendMessageResponse {
                session_id,
                reply: None,
                error: Some(source.to_string()),
            }))
        }
        Err(err) => Err(service_error(&err)),
    }
}
