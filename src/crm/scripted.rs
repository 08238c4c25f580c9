//! Scripted `CrmApi` double for tests: records every call and fails the
//! operations it is told to fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{CrmApi, CrmContact};
use crate::error::IntakeError;
use crate::submission::ContactProperties;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Find,
    Create,
    Update,
    Engagement,
    CreateNote,
    Associate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CrmCall {
    Find(String),
    Create(ContactProperties),
    Update(String, ContactProperties),
    Engagement { contact_id: String, body: String },
    CreateNote(String),
    Associate { note_id: String, contact_id: String },
}

impl CrmCall {
    pub(crate) fn op(&self) -> Op {
        match self {
            Self::Find(_) => Op::Find,
            Self::Create(_) => Op::Create,
            Self::Update(..) => Op::Update,
            Self::Engagement { .. } => Op::Engagement,
            Self::CreateNote(_) => Op::CreateNote,
            Self::Associate { .. } => Op::Associate,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Failure {
    /// Non-2xx answer with this status and message.
    Status(u16, String),
    /// Transport-level failure.
    Transport(String),
}

impl Failure {
    fn to_error(&self) -> IntakeError {
        match self {
            Self::Status(status, message) => IntakeError::UpstreamHttp {
                status: *status,
                message: message.clone(),
                body: serde_json::json!({ "message": message }),
            },
            Self::Transport(message) => IntakeError::Integration(message.clone()),
        }
    }
}

/// Lookups return `existing` (or nothing); creates hand out ids from 1000.
#[derive(Debug)]
pub(crate) struct ScriptedCrm {
    existing: Option<CrmContact>,
    failures: HashMap<Op, Failure>,
    calls: Mutex<Vec<CrmCall>>,
    next_id: AtomicU64,
}

impl ScriptedCrm {
    /// Every lookup reports not-found.
    pub(crate) fn empty() -> Self {
        Self {
            existing: None,
            failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1000),
        }
    }

    /// Every lookup finds a contact with this id.
    pub(crate) fn with_existing(contact_id: &str) -> Self {
        Self {
            existing: Some(CrmContact {
                id: contact_id.to_string(),
                properties: HashMap::new(),
            }),
            ..Self::empty()
        }
    }

    pub(crate) fn failing(mut self, op: Op, failure: Failure) -> Self {
        self.failures.insert(op, failure);
        self
    }

    pub(crate) fn calls(&self) -> Vec<CrmCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn count(&self, op: Op) -> usize {
        self.calls.lock().iter().filter(|c| c.op() == op).count()
    }

    fn record(&self, call: CrmCall) -> Result<(), IntakeError> {
        let op = call.op();
        self.calls.lock().push(call);
        match self.failures.get(&op) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn allocate_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

#[async_trait]
impl CrmApi for ScriptedCrm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn find_contact_by_email(&self, email: &str) -> Result<Option<CrmContact>, IntakeError> {
        self.record(CrmCall::Find(email.to_string()))?;
        // Let concurrent submissions interleave between lookup and write.
        tokio::task::yield_now().await;
        Ok(self.existing.clone())
    }

    async fn create_contact(&self, properties: &ContactProperties) -> Result<String, IntakeError> {
        self.record(CrmCall::Create(properties.clone()))?;
        Ok(self.allocate_id())
    }

    async fn update_contact(
        &self,
        contact_id: &str,
        properties: &ContactProperties,
    ) -> Result<(), IntakeError> {
        self.record(CrmCall::Update(contact_id.to_string(), properties.clone()))
    }

    async fn create_engagement_note(
        &self,
        contact_id: &str,
        body: &str,
        _at: DateTime<Utc>,
    ) -> Result<(), IntakeError> {
        self.record(CrmCall::Engagement {
            contact_id: contact_id.to_string(),
            body: body.to_string(),
        })
    }

    async fn create_note(&self, body: &str, _at: DateTime<Utc>) -> Result<String, IntakeError> {
        self.record(CrmCall::CreateNote(body.to_string()))?;
        Ok(self.allocate_id())
    }

    async fn associate_note_with_contact(
        &self,
        note_id: &str,
        contact_id: &str,
    ) -> Result<(), IntakeError> {
        self.record(CrmCall::Associate {
            note_id: note_id.to_string(),
            contact_id: contact_id.to_string(),
        })
    }
}
