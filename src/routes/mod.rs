//! API routes
//!
//! Thin JSON surface over [`ConversationManager`] for the chat front end.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conversation::{Conversation, Message};
use crate::core::{ChatError, ConversationManager, SendOutcome, SessionOverview};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ConversationManager>,
    pub suggestions: Arc<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

enum ApiError {
    NotFound(String),
    Internal(String),
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::ConversationNotFound(_) => ApiError::NotFound(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub content: String,
    /// Wait for the assistant reply instead of answering 202 right away
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Serialize)]
struct PendingResponse {
    status: &'static str,
    conversation_id: String,
    message_id: String,
}

#[derive(Debug, Serialize)]
struct SuggestionsResponse {
    suggestions: Vec<String>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_conversations(State(state): State<AppState>) -> Json<SessionOverview> {
    Json(state.manager.overview())
}

async fn create_conversation(State(state): State<AppState>) -> (StatusCode, Json<Conversation>) {
    (StatusCode::CREATED, Json(state.manager.create_conversation()))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    state
        .manager
        .conversation(&id)
        .map(Json)
        .ok_or_else(|| ApiError::from(ChatError::ConversationNotFound(id)))
}

async fn active_conversation(State(state): State<AppState>) -> Result<Json<Conversation>, ApiError> {
    state
        .manager
        .active_conversation()
        .map(Json)
        .ok_or_else(|| ApiError::Internal("no active conversation".to_string()))
}

async fn active_messages(State(state): State<AppState>) -> Json<Vec<Message>> {
    Json(state.manager.active_messages())
}

async fn select_conversation(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<Conversation>, ApiError> {
    state.manager.select_conversation(&request.id)?;
    active_conversation(State(state)).await
}

async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionOverview>, ApiError> {
    state.manager.delete_conversation(&id)?;
    Ok(Json(state.manager.overview()))
}

async fn send_message(State(state): State<AppState>, Json(request): Json<SendRequest>) -> Response {
    let pending = match state.manager.begin_send(&request.content) {
        Ok(pending) => pending,
        Err(reason) => return Json(SendOutcome::Skipped { reason }).into_response(),
    };

    // Resolved on its own task so a client disconnect cannot cancel the reply
    if request.wait {
        return Json(state.manager.complete_send(pending).await).into_response();
    }

    let accepted = PendingResponse {
        status: "pending",
        conversation_id: pending.conversation_id().to_string(),
        message_id: pending.message_id().to_string(),
    };
    tokio::spawn(async move {
        let outcome = pending.resolve().await;
        debug!(?outcome, "Background reply resolved");
    });

    (StatusCode::ACCEPTED, Json(accepted)).into_response()
}

async fn suggestions(State(state): State<AppState>) -> Json<SuggestionsResponse> {
    Json(SuggestionsResponse {
        suggestions: state.suggestions.as_ref().clone(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/v1/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/v1/conversations/active",
            get(active_conversation).put(select_conversation),
        )
        .route("/v1/conversations/active/messages", get(active_messages))
        .route(
            "/v1/conversations/:id",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/v1/messages", post(send_message))
        .route("/v1/suggestions", get(suggestions))
}
