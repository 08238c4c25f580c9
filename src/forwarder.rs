//! Contact intake forwarder.
//!
//! Turns a validated submission into CRM writes:
//!
//! 1. Look up the contact by email.
//! 2. Update it if found, create it otherwise.
//! 3. Attach one note describing the submission.
//!
//! Note attachment tries the engagement mechanism first. When that fails the
//! forwarder creates a standalone note and associates it with the contact.
//! Under [`NoteFallbackPolicy::UnavailableOnly`] only 403/404 fall back;
//! other primary failures skip the note and the submission still succeeds.
//!
//! Lookup-then-write is not atomic: two concurrent submissions for a new
//! email can both miss the lookup and create two contacts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::NoteFallbackPolicy;
use crate::crm::CrmApi;
use crate::error::IntakeError;
use crate::submission::{ContactProperties, Submission, SubmissionPayload};

/// Which write the upsert performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Created,
    Updated,
}

/// How (or whether) the submission note ended up on the contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoteOutcome {
    /// Attached by the primary engagement mechanism.
    Engagement,
    /// Attached as a standalone note plus association.
    Standalone { note_id: String },
    /// The primary mechanism failed and no fallback was attempted.
    NoteAttachmentSkipped {
        status: Option<u16>,
        reason: String,
    },
}

/// Result of one successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitReport {
    pub submission_id: Uuid,
    pub contact_id: String,
    pub upsert: UpsertAction,
    pub note: NoteOutcome,
}

/// Forwards contact submissions to a CRM.
#[derive(Clone)]
pub struct ContactForwarder {
    crm: Arc<dyn CrmApi>,
    fallback: NoteFallbackPolicy,
}

impl std::fmt::Debug for ContactForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactForwarder")
            .field("crm", &self.crm.name())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl ContactForwarder {
    pub fn new(crm: Arc<dyn CrmApi>, fallback: NoteFallbackPolicy) -> Self {
        Self { crm, fallback }
    }

    pub fn fallback_policy(&self) -> NoteFallbackPolicy {
        self.fallback
    }

    /// Validate a raw payload and forward it. Validation failures return
    /// before any CRM call.
    pub async fn submit(
        &self,
        payload: SubmissionPayload,
        referer: Option<&str>,
    ) -> Result<SubmitReport, IntakeError> {
        let submission = payload.validate(referer)?;
        self.forward(&submission).await
    }

    /// Upsert the contact and attach the submission note.
    pub async fn forward(&self, submission: &Submission) -> Result<SubmitReport, IntakeError> {
        let submission_id = Uuid::new_v4();
        tracing::debug!(
            %submission_id,
            crm = self.crm.name(),
            source = %submission.source_url,
            "forwarding contact submission"
        );

        let (contact_id, upsert) = self
            .upsert_contact(&submission.contact_properties())
            .await?;
        let note = self
            .attach_note(&contact_id, &submission.note_body(), Utc::now())
            .await?;

        tracing::info!(
            %submission_id,
            contact_id = %contact_id,
            upsert = ?upsert,
            note = ?note,
            "contact submission forwarded"
        );

        Ok(SubmitReport {
            submission_id,
            contact_id,
            upsert,
            note,
        })
    }

    /// Update the contact with this email if one exists, otherwise create it.
    pub async fn upsert_contact(
        &self,
        properties: &ContactProperties,
    ) -> Result<(String, UpsertAction), IntakeError> {
        match self.crm.find_contact_by_email(&properties.email).await? {
            Some(existing) => {
                self.crm.update_contact(&existing.id, properties).await?;
                Ok((existing.id, UpsertAction::Updated))
            }
            None => {
                let id = self.crm.create_contact(properties).await?;
                Ok((id, UpsertAction::Created))
            }
        }
    }

    /// Attach a note to the contact. Only a failed fallback is an error.
    pub async fn attach_note(
        &self,
        contact_id: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<NoteOutcome, IntakeError> {
        let err = match self.crm.create_engagement_note(contact_id, body, at).await {
            Ok(()) => return Ok(NoteOutcome::Engagement),
            Err(err) => err,
        };

        let fall_back = err.is_unavailable() || self.fallback == NoteFallbackPolicy::AnyError;
        if !fall_back {
            tracing::warn!(
                contact_id,
                status = ?err.upstream_status(),
                error = %err,
                "engagement note failed; note dropped"
            );
            return Ok(NoteOutcome::NoteAttachmentSkipped {
                status: err.upstream_status(),
                reason: err.to_string(),
            });
        }

        tracing::info!(
            contact_id,
            status = ?err.upstream_status(),
            "engagement note failed; creating standalone note"
        );
        let note_id = self.crm.create_note(body, at).await?;
        self.crm
            .associate_note_with_contact(&note_id, contact_id)
            .await?;
        Ok(NoteOutcome::Standalone { note_id })
    }
}
