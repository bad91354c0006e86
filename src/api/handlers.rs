//! HTTP request handlers

use super::types::{ChatReply, ErrorResponse, ExampleRequest, SendRequest, WelcomeRequest};
use super::AppState;
use crate::llm::{LlmErrorKind, Message};
use crate::proxy::ProxyError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat/send", post(send))
        .route("/api/chat/welcome", get(welcome).post(welcome_post))
        .route("/api/chat/example", post(example))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn send(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<ChatReply>, AppError> {
    tracing::debug!(history_len = req.messages.len(), "Relaying conversation");
    let reply = state.proxy.send(req.messages).await?;
    Ok(Json(reply))
}

async fn welcome(State(state): State<AppState>) -> Result<Json<ChatReply>, AppError> {
    let reply = state.proxy.welcome().await?;
    Ok(Json(reply))
}

async fn welcome_post(
    state: State<AppState>,
    Json(_req): Json<WelcomeRequest>,
) -> Result<Json<ChatReply>, AppError> {
    welcome(state).await
}

async fn example(
    State(state): State<AppState>,
    Json(req): Json<ExampleRequest>,
) -> Json<Message> {
    Json(state.proxy.example(&req.role, &req.content).await)
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("virtual-vince ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub(crate) enum AppError {
    BadRequest(String),
    BadGateway(String),
    Unavailable(String),
}

impl From<ProxyError> for AppError {
    fn from(e: ProxyError) -> Self {
        let message = e.to_string();
        match e {
            ProxyError::Unavailable => AppError::Unavailable(message),
            ProxyError::Completion(ref llm) if llm.kind == LlmErrorKind::InvalidRequest => {
                AppError::BadRequest(message)
            }
            ProxyError::Completion(_) | ProxyError::Transport(_) | ProxyError::Server { .. } => {
                AppError::BadGateway(message)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        if status.is_server_error() {
            tracing::warn!(status = %status, error = %message, "Chat request failed");
        }

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
