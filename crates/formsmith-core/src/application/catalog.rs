//! Saved-form catalog
//!
//! Forms are stored whole under their name as `{createdAt, fields}`.
//! Saving overwrites; there is no versioning. A record that does not parse
//! is treated as absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::aggregates::{FieldDescriptor, FormDescriptor};
use crate::error::{FormsError, Result};
use crate::ports::outbound::{KeyValueStore, StorageError};

/// Persisted record layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredForm {
    pub created_at: DateTime<Utc>,
    pub fields: Vec<FieldDescriptor>,
}

impl From<&FormDescriptor> for StoredForm {
    fn from(form: &FormDescriptor) -> Self {
        Self { created_at: form.created_at(), fields: form.fields().to_vec() }
    }
}

/// One entry of the saved-forms list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFormSummary {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredHeader {
    created_at: DateTime<Utc>,
}

/// Form persistence over a key-value store
#[derive(Clone)]
pub struct FormCatalog {
    store: Arc<dyn KeyValueStore>,
}

impl FormCatalog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Write the form under its name, replacing any previous record
    pub async fn save(&self, form: &FormDescriptor) -> Result<()> {
        let name = form.name().trim();
        if name.is_empty() {
            return Err(FormsError::InvalidSchema("form name is required".into()));
        }
        form.check_integrity()?;

        let record = serde_json::to_string(&StoredForm::from(form))?;
        self.store.set(form.name(), record).await?;
        info!(form = form.name(), fields = form.fields().len(), "form saved");
        Ok(())
    }

    /// Load a form by name; `None` if missing or unreadable
    pub async fn load(&self, name: &str) -> Result<Option<FormDescriptor>> {
        let Some(raw) = self.store.get(name).await? else {
            debug!(form = name, "no stored form");
            return Ok(None);
        };
        match serde_json::from_str::<StoredForm>(&raw) {
            Ok(record) => Ok(Some(FormDescriptor::restore(name, record.created_at, record.fields))),
            Err(error) => {
                warn!(form = name, %error, "stored form is malformed");
                Ok(None)
            }
        }
    }

    /// [`load`](Self::load), with absence as [`FormsError::FormNotFound`]
    pub async fn require(&self, name: &str) -> Result<FormDescriptor> {
        self.load(name).await?.ok_or_else(|| FormsError::FormNotFound(name.to_string()))
    }

    /// Every readable saved form, sorted by name
    pub async fn list(&self) -> Result<Vec<SavedFormSummary>> {
        let mut summaries = Vec::new();
        for name in self.store.list_keys().await? {
            let Some(raw) = self.store.get(&name).await? else { continue };
            match serde_json::from_str::<StoredHeader>(&raw) {
                Ok(header) => summaries.push(SavedFormSummary { name, created_at: header.created_at }),
                Err(error) => debug!(key = %name, %error, "skipping unreadable entry"),
            }
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        match self.store.remove(name).await {
            Ok(()) => {
                info!(form = name, "form deleted");
                Ok(())
            }
            Err(StorageError::NotFound(_)) => Err(FormsError::FormNotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
