//! In-process CRM backend.
//!
//! Keeps contacts and notes in memory so the service can run locally without
//! CRM credentials (`INTAKE_CRM_BACKEND=memory`). Emails are matched exactly,
//! ids are sequential numeric strings.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{CrmApi, CrmContact};
use crate::error::IntakeError;
use crate::submission::ContactProperties;

/// A note held by [`InMemoryCrm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Contacts this note is associated with.
    pub contact_ids: Vec<String>,
}

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    contacts: HashMap<String, ContactProperties>,
    notes: Vec<StoredNote>,
}

impl Store {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

/// `CrmApi` backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryCrm {
    store: Mutex<Store>,
}

impl InMemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contact properties by id.
    pub fn contact(&self, contact_id: &str) -> Option<ContactProperties> {
        self.store.lock().contacts.get(contact_id).cloned()
    }

    pub fn contact_count(&self) -> usize {
        self.store.lock().contacts.len()
    }

    /// Notes associated with a contact, oldest first.
    pub fn notes_for(&self, contact_id: &str) -> Vec<StoredNote> {
        self.store
            .lock()
            .notes
            .iter()
            .filter(|n| n.contact_ids.iter().any(|c| c == contact_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CrmApi for InMemoryCrm {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_contact_by_email(&self, email: &str) -> Result<Option<CrmContact>, IntakeError> {
        let store = self.store.lock();
        Ok(store
            .contacts
            .iter()
            .find(|(_, props)| props.email == email)
            .map(|(id, props)| CrmContact {
                id: id.clone(),
                properties: HashMap::from([
                    ("email".to_string(), Some(props.email.clone())),
                    ("firstname".to_string(), Some(props.firstname.clone())),
                    ("lastname".to_string(), Some(props.lastname.clone())),
                    ("company".to_string(), Some(props.company.clone())),
                    ("jobtitle".to_string(), Some(props.jobtitle.clone())),
                ]),
            }))
    }

    async fn create_contact(&self, properties: &ContactProperties) -> Result<String, IntakeError> {
        let mut store = self.store.lock();
        let id = store.allocate_id();
        store.contacts.insert(id.clone(), properties.clone());
        tracing::debug!(contact_id = %id, "memory CRM created contact");
        Ok(id)
    }

    async fn update_contact(
        &self,
        contact_id: &str,
        properties: &ContactProperties,
    ) -> Result<(), IntakeError> {
        let mut store = self.store.lock();
        match store.contacts.get_mut(contact_id) {
            Some(existing) => {
                *existing = properties.clone();
                Ok(())
            }
            None => Err(IntakeError::UpstreamHttp {
                status: 404,
                message: format!("Contact {} not found", contact_id),
                body: serde_json::Value::Null,
            }),
        }
    }

    async fn create_engagement_note(
        &self,
        contact_id: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<(), IntakeError> {
        let mut store = self.store.lock();
        let id = store.allocate_id();
        store.notes.push(StoredNote {
            id,
            body: body.to_string(),
            created_at: at,
            contact_ids: vec![contact_id.to_string()],
        });
        Ok(())
    }

    async fn create_note(&self, body: &str, at: DateTime<Utc>) -> Result<String, IntakeError> {
        let mut store = self.store.lock();
        let id = store.allocate_id();
        store.notes.push(StoredNote {
            id: id.clone(),
            body: body.to_string(),
            created_at: at,
            contact_ids: Vec::new(),
        });
        Ok(id)
    }

    async fn associate_note_with_contact(
        &self,
        note_id: &str,
        contact_id: &str,
    ) -> Result<(), IntakeError> {
        let mut store = self.store.lock();
        let note = store
            .notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| IntakeError::UpstreamHttp {
                status: 404,
                message: format!("Note {} not found", note_id),
                body: serde_json::Value::Null,
            })?;
        if !note.contact_ids.iter().any(|c| c == contact_id) {
            note.contact_ids.push(contact_id.to_string());
        }
        Ok(())
    }
}
