//! HTTP request handlers

use super::messages::respond;
use super::types::{ErrorResponse, MessageRequest, MessageResponse};
use super::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

const INTERNAL_ERROR_MESSAGE: &str = "Sorry, something went wrong. Please try again later.";
const SUPERSEDED_MESSAGE: &str = "Superseded by a newer message from the same user";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let max_concurrent = state.max_concurrent;

    Router::new()
        .route("/api/users/:user_id/messages", post(post_message))
        .route("/version", get(get_version))
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn post_message(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let span = tracing::info_span!("message", req_id = %Uuid::new_v4(), user_id = %user_id);

    async move {
        let reply = state
            .sequencer
            .run(&user_id, respond(&state.service, &user_id, &req.text))
            .await
            .ok_or(AppError::Superseded)?;

        match reply {
            Ok(resp) => Ok(Json(resp)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to handle message");
                Err(AppError::Internal)
            }
        }
    }
    .instrument(span)
    .await
}

async fn get_version() -> &'static str {
    concat!("tunnel-keys ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    /// A newer message from the same user took over
    Superseded,
    /// Details are logged, never returned
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Superseded => (StatusCode::CONFLICT, SUPERSEDED_MESSAGE),
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
