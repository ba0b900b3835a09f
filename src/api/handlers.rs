//! HTTP request handlers

use super::types::{ErrorResponse, HealthResponse};
use super::AppState;
use crate::session::SessionAttributes;
use crate::skill::{RequestEnvelope, ResponseEnvelope, TurnOutcome};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Platform webhook
        .route("/", post(handle_envelope))
        .route("/health", get(health))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

// ============================================================
// Skill endpoint
// ============================================================

async fn handle_envelope(
    State(state): State<AppState>,
    payload: Result<Json<RequestEnvelope>, JsonRejection>,
) -> Result<Json<ResponseEnvelope>, AppError> {
    let Json(envelope) = payload.map_err(|e| {
        tracing::warn!(error = %e.body_text(), "Rejected malformed envelope");
        AppError::BadRequest(e.body_text())
    })?;

    // Kept aside so a panicking turn can still hand the session back intact
    let attributes = envelope
        .session
        .as_ref()
        .map(|session| session.attributes.clone())
        .unwrap_or_default();

    let skill = state.skill.clone();
    match tokio::spawn(async move { skill.handle(envelope).await }).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::error!(error = %e, "Turn task failed, answering with apology");
            Ok(Json(TurnOutcome::apology(attributes).into_envelope()))
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.skill.model_id().to_string(),
    })
}

/// Last-resort answer for a panic outside the turn task (extractors,
/// routing). The request body is gone by then, so the reply carries an
/// empty attribute bag.
#[allow(clippy::needless_pass_by_value)] // Signature fixed by CatchPanicLayer
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(
        panic = %detail,
        "Request handler panicked, session attributes lost"
    );

    Json(TurnOutcome::apology(SessionAttributes::new()).into_envelope()).into_response()
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
