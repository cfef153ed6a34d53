//! Form events
use serde::Serialize;

use crate::domain::value_objects::FieldId;

/// Builder-side changes to a form, drained by the caller after each edit
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FormEvent {
    FieldAdded { field_id: FieldId },
    FieldUpdated { field_id: FieldId },
    FieldRemoved { field_id: FieldId },
    FieldMoved { field_id: FieldId, from: usize, to: usize },
}

impl FormEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            FormEvent::FieldAdded { .. } => "form.field_added",
            FormEvent::FieldUpdated { .. } => "form.field_updated",
            FormEvent::FieldRemoved { .. } => "form.field_removed",
            FormEvent::FieldMoved { .. } => "form.field_moved",
        }
    }
}
