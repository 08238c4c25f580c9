//! CRM port.
//!
//! `CrmApi` is the contract the forwarder talks to. Implementations:
//!
//! - [`hubspot::HubSpotClient`] — HubSpot REST API over `reqwest`
//! - [`memory::InMemoryCrm`] — in-process store for local runs

pub mod hubspot;
pub mod memory;

#[cfg(test)]
pub(crate) mod scripted;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{CrmBackend, CrmConfig};
use crate::error::IntakeError;
use crate::submission::ContactProperties;

pub use hubspot::HubSpotClient;
pub use memory::InMemoryCrm;

/// Contact properties requested from contact searches.
pub const CONTACT_PROPERTIES: &[&str] = &["email", "firstname", "lastname", "company", "jobtitle"];

/// A contact as returned by a CRM lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmContact {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Option<String>>,
}

/// Operations the intake flow needs from a CRM.
///
/// Each method is one upstream round trip. Implementations report non-2xx
/// responses as [`IntakeError::UpstreamHttp`] so callers can classify them.
#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Look up a contact by exact email.
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<CrmContact>, IntakeError>;

    /// Create a contact and return its id.
    async fn create_contact(&self, properties: &ContactProperties) -> Result<String, IntakeError>;

    /// Overwrite the given properties on an existing contact.
    async fn update_contact(
        &self,
        contact_id: &str,
        properties: &ContactProperties,
    ) -> Result<(), IntakeError>;

    /// Primary note mechanism: a NOTE engagement associated with the contact
    /// in one call.
    async fn create_engagement_note(
        &self,
        contact_id: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<(), IntakeError>;

    /// Fallback note mechanism, step one: a standalone note record.
    async fn create_note(&self, body: &str, at: DateTime<Utc>) -> Result<String, IntakeError>;

    /// Fallback note mechanism, step two: link a note to a contact.
    async fn associate_note_with_contact(
        &self,
        note_id: &str,
        contact_id: &str,
    ) -> Result<(), IntakeError>;
}

/// Build the configured CRM backend.
///
/// Fails with [`IntakeError::Configuration`] when the HubSpot backend is
/// selected without a token.
pub fn connect(config: &CrmConfig) -> Result<Arc<dyn CrmApi>, IntakeError> {
    match config.backend {
        CrmBackend::HubSpot => Ok(Arc::new(HubSpotClient::new(config)?)),
        CrmBackend::Memory => Ok(Arc::new(InMemoryCrm::new())),
    }
}
