//! Service configuration.
//!
//! Read once at startup from the process environment and passed explicitly
//! to the CRM backend and the forwarder. Nothing downstream reads the
//! environment on its own.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `INTAKE_BIND_HOST` — listen host (default: "0.0.0.0")
//! - `INTAKE_CONTACT_PATH` — submission route (default: "/api/contact")
//! - `INTAKE_CRM_BACKEND` — "hubspot" (default) or "memory"
//! - `HUBSPOT_BASE_URL` — CRM API base (default: "https://api.hubapi.com")
//! - `HUBSPOT_PRIVATE_APP_TOKEN` — bearer token, required for "hubspot"
//! - `HUBSPOT_TIMEOUT_SECS` — optional per-call timeout
//! - `INTAKE_NOTE_FALLBACK` — "any-error" (default) or "unavailable-only"

use crate::error::IntakeError;

/// Which CRM implementation the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrmBackend {
    #[default]
    HubSpot,
    /// In-process store, for local runs without credentials.
    Memory,
}

impl std::str::FromStr for CrmBackend {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hubspot" => Ok(Self::HubSpot),
            "memory" => Ok(Self::Memory),
            other => Err(IntakeError::Configuration(format!(
                "unknown CRM backend '{}' (expected 'hubspot' or 'memory')",
                other
            ))),
        }
    }
}

/// What to do when the primary (engagement) note mechanism fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteFallbackPolicy {
    /// Fall back on any primary failure.
    #[default]
    AnyError,
    /// Fall back only on 403/404; other failures skip the note.
    UnavailableOnly,
}

impl std::str::FromStr for NoteFallbackPolicy {
    type Err = IntakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unavailable-only" => Ok(Self::UnavailableOnly),
            "any-error" => Ok(Self::AnyError),
            other => Err(IntakeError::Configuration(format!(
                "unknown note fallback policy '{}' (expected 'unavailable-only' or 'any-error')",
                other
            ))),
        }
    }
}

/// CRM connection settings.
#[derive(Clone)]
pub struct CrmConfig {
    pub backend: CrmBackend,
    pub base_url: String,
    /// Private app token. Required by the HubSpot backend.
    pub access_token: Option<String>,
    /// Per-call timeout. `None` leaves calls unbounded.
    pub timeout_secs: Option<u64>,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            backend: CrmBackend::default(),
            base_url: "https://api.hubapi.com".to_string(),
            access_token: None,
            timeout_secs: None,
        }
    }
}

impl std::fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmConfig")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub host: String,
    pub port: u16,
    pub contact_path: String,
    pub note_fallback: NoteFallbackPolicy,
    pub crm: CrmConfig,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            contact_path: "/api/contact".to_string(),
            note_fallback: NoteFallbackPolicy::default(),
            crm: CrmConfig::default(),
        }
    }
}

impl IntakeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, IntakeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IntakeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(host) = get("INTAKE_BIND_HOST") {
            config.host = host;
        }
        if let Some(port) = get("PORT") {
            config.port = port.parse().map_err(|_| {
                IntakeError::Configuration(format!("PORT must be a port number, got '{}'", port))
            })?;
        }
        if let Some(path) = get("INTAKE_CONTACT_PATH") {
            if !path.starts_with('/') {
                return Err(IntakeError::Configuration(format!(
                    "INTAKE_CONTACT_PATH must start with '/', got '{}'",
                    path
                )));
            }
            config.contact_path = path;
        }
        if let Some(policy) = get("INTAKE_NOTE_FALLBACK") {
            config.note_fallback = policy.parse()?;
        }
        if let Some(backend) = get("INTAKE_CRM_BACKEND") {
            config.crm.backend = backend.parse()?;
        }
        if let Some(base_url) = get("HUBSPOT_BASE_URL") {
            config.crm.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.crm.access_token = get("HUBSPOT_PRIVATE_APP_TOKEN");
        if let Some(secs) = get("HUBSPOT_TIMEOUT_SECS") {
            config.crm.timeout_secs = Some(secs.parse().map_err(|_| {
                IntakeError::Configuration(format!(
                    "HUBSPOT_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    secs
                ))
            })?);
        }

        Ok(config)
    }

    /// `host:port` string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
