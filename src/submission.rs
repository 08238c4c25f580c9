//! Contact form submissions.
//!
//! The wire payload (`SubmissionPayload`) is loose: every field is optional.
//! `SubmissionPayload::validate` turns it into a `Submission`, which is the
//! only shape the forwarder accepts.

use serde::{Deserialize, Serialize};

use crate::error::IntakeError;

/// Placeholder last name used when the submitted name has a single token.
pub const LAST_NAME_PLACEHOLDER: &str = "—";

/// First line of every note created from a submission.
pub const NOTE_HEADER: &str = "Website contact form submission";

/// JSON body posted by the contact forms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Page the form was submitted from.
    #[serde(default)]
    pub source_url: Option<String>,
}

impl SubmissionPayload {
    /// Validate the payload. `referer` is used as the source when the
    /// payload carries none.
    pub fn validate(self, referer: Option<&str>) -> Result<Submission, IntakeError> {
        let email = self.email.unwrap_or_default();
        if email.trim().is_empty() {
            return Err(IntakeError::Validation("Email is required".to_string()));
        }

        let source_url = self
            .source_url
            .filter(|s| !s.is_empty())
            .or_else(|| referer.filter(|r| !r.is_empty()).map(String::from))
            .unwrap_or_default();

        Ok(Submission {
            name: self.name.unwrap_or_default(),
            email,
            company: self.company.unwrap_or_default(),
            role: self.role.unwrap_or_default(),
            message: self.message.unwrap_or_default(),
            source_url,
        })
    }
}

/// A validated submission. `email` is non-empty; other fields may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub company: String,
    pub role: String,
    pub message: String,
    pub source_url: String,
}

impl Submission {
    /// Contact properties derived from this submission.
    pub fn contact_properties(&self) -> ContactProperties {
        let (firstname, lastname) = split_name(&self.name);
        ContactProperties {
            email: self.email.clone(),
            firstname,
            lastname,
            company: self.company.clone(),
            jobtitle: self.role.clone(),
        }
    }

    /// Note body: header, source, name and email always; company, role and
    /// message only when non-empty.
    pub fn note_body(&self) -> String {
        let source = if self.source_url.is_empty() {
            "unknown"
        } else {
            self.source_url.as_str()
        };

        let mut lines = vec![
            NOTE_HEADER.to_string(),
            format!("Source: {}", source),
            format!("Name: {}", self.name),
            format!("Email: {}", self.email),
        ];
        for (label, value) in [
            ("Company", &self.company),
            ("Role", &self.role),
            ("Message", &self.message),
        ] {
            if !value.is_empty() {
                lines.push(format!("{}: {}", label, value));
            }
        }
        lines.join("\n")
    }
}

/// Contact fields written to the CRM on both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactProperties {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub company: String,
    pub jobtitle: String,
}

/// Split a full name into first and last name.
///
/// The first whitespace-delimited token is the first name; the rest, joined
/// by single spaces, is the last name. A missing last name becomes
/// [`LAST_NAME_PLACEHOLDER`].
pub fn split_name(full_name: &str) -> (String, String) {
    let mut tokens = full_name.split_whitespace();
    let first = tokens.next().unwrap_or_default().to_string();
    let rest = tokens.collect::<Vec<_>>().join(" ");
    let last = if rest.is_empty() {
        LAST_NAME_PLACEHOLDER.to_string()
    } else {
        rest
    };
    (first, last)
}
