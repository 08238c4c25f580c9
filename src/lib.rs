//! # purexcel-intake
//!
//! Contact form intake for the Purexcel marketing sites. A submission is
//! validated, upserted into the CRM as a contact keyed by email, and
//! recorded as a note on that contact.
//!
//! The pieces:
//!
//! - [`submission`] — wire payload, validation, name split, note body
//! - [`crm`] — the `CrmApi` port with HubSpot and in-memory backends
//! - [`forwarder`] — upsert and note attachment with fallback
//! - [`server`] — axum routes

pub mod config;
pub mod crm;
pub mod error;
pub mod forwarder;
pub mod server;
pub mod submission;

pub use config::{CrmBackend, CrmConfig, IntakeConfig, NoteFallbackPolicy};
pub use crm::{CrmApi, CrmContact, HubSpotClient, InMemoryCrm};
pub use error::IntakeError;
pub use forwarder::{ContactForwarder, NoteOutcome, SubmitReport, UpsertAction};
pub use submission::{ContactProperties, Submission, SubmissionPayload};

/// Crate version reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
