//! Axum route handlers for the intake server.
//!
//! # Routes
//!
//! - `GET  /health`       — Returns `{"status": "ok", "version": ..., "service": "purexcel-intake"}`
//! - `POST /api/contact`  — Accepts a contact form submission (path configurable)

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::IntakeError;
use crate::forwarder::{ContactForwarder, SubmitReport};
use crate::submission::SubmissionPayload;

/// Default submission route.
pub const CONTACT_PATH: &str = "/api/contact";

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<ContactForwarder>,
}

impl AppState {
    pub fn new(forwarder: ContactForwarder) -> Self {
        Self {
            forwarder: Arc::new(forwarder),
        }
    }
}

/// Response body for the submission route: `{ok: true}` or
/// `{ok: false, error: "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

impl From<&Result<SubmitReport, IntakeError>> for SubmitResponse {
    fn from(result: &Result<SubmitReport, IntakeError>) -> Self {
        match result {
            Ok(_) => Self::success(),
            Err(err) => Self::failure(err.to_string()),
        }
    }
}

/// Build the axum router with the submission route at [`CONTACT_PATH`].
pub fn app_router(state: AppState) -> Router {
    app_router_at(state, CONTACT_PATH)
}

/// Build the axum router with the submission route at `contact_path`.
pub fn app_router_at(state: AppState, contact_path: &str) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(contact_path, post(contact_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health — liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "purexcel-intake",
    }))
}

/// POST /api/contact — forward a contact form submission to the CRM.
///
/// Request:  `{ name, email, company?, role?, message?, sourceUrl? }`
/// Response: `{ ok: true }` (200), or `{ ok: false, error }` with 400 for a
/// missing email or unreadable body and 500 for any CRM failure.
async fn contact_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SubmissionPayload>, JsonRejection>,
) -> (StatusCode, Json<SubmitResponse>) {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected contact submission body");
            return (
                StatusCode::BAD_REQUEST,
                Json(SubmitResponse::failure(rejection.body_text())),
            );
        }
    };

    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok());

    let result = state.forwarder.submit(payload, referer).await;
    let response = SubmitResponse::from(&result);

    match result {
        Ok(_) => (StatusCode::OK, Json(response)),
        Err(err) => {
            let status = err.http_status();
            if status.is_server_error() {
                tracing::error!(error = %err, upstream_status = ?err.upstream_status(), "contact submission failed");
            } else {
                tracing::debug!(error = %err, "contact submission rejected");
            }
            (status, Json(response))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
