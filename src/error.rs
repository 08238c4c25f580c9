//! Error taxonomy for the intake service.
//!
//! Every failure a submission can hit is one of four kinds:
//!
//! - `Validation` — a required field is missing; raised before any CRM call.
//! - `Configuration` — a required setting (usually the CRM token) is absent
//!   or malformed; raised at startup.
//! - `UpstreamHttp` — the CRM answered with a non-2xx status.
//! - `Integration` — everything else (transport failures, malformed
//!   responses), reported to the caller with its message.

use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors produced while validating and forwarding a contact submission.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// A required submission field is missing.
    #[error("{0}")]
    Validation(String),

    /// Process configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The CRM returned a non-success status.
    #[error("{message}")]
    UpstreamHttp {
        status: u16,
        message: String,
        body: Value,
    },

    /// Catch-all for transport and decoding failures.
    #[error("{0}")]
    Integration(String),
}

impl IntakeError {
    /// HTTP status to report to the submitting client.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upstream status code, if this error came from a CRM response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamHttp { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the CRM reported the endpoint as forbidden or missing,
    /// i.e. the mechanism is not available for this account.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.upstream_status(), Some(403) | Some(404))
    }

    /// Build an `UpstreamHttp` error from a raw CRM response.
    ///
    /// The message is the JSON `message` field, then `reason`, then the raw
    /// body text, then `HTTP <status>`. Empty strings are skipped.
    pub fn from_upstream(status: u16, text: &str) -> Self {
        let json: Option<Value> = serde_json::from_str(text).ok();
        let field = |name: &str| {
            json.as_ref()
                .and_then(|v| v.get(name))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        let message = field("message")
            .or_else(|| field("reason"))
            .or_else(|| (!text.is_empty()).then(|| text.to_string()))
            .unwrap_or_else(|| format!("HTTP {}", status));

        Self::UpstreamHttp {
            status,
            message,
            body: json.unwrap_or_else(|| Value::String(text.to_string())),
        }
    }
}

impl From<reqwest::Error> for IntakeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Integration(err.to_string())
    }
}

impl From<serde_json::Error> for IntakeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Integration(format!("Invalid CRM response: {}", err))
    }
}
