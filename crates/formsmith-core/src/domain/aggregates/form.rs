//! Form Aggregate
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::domain::aggregates::field::FieldDescriptor;
use crate::domain::events::FormEvent;
use crate::domain::value_objects::{DerivedSpec, FieldId, FieldOption, FieldType};
use crate::error::{FormsError, Result};

/// Named, ordered collection of fields; the unit of persistence
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDescriptor {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    fields: Vec<FieldDescriptor>,
    #[serde(skip)]
    events: Vec<FormEvent>,
}

impl FormDescriptor {
    /// Empty form, stamped now
    pub fn create(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            fields: vec![],
            events: vec![],
        }
    }

    /// Rebuild a stored form. The id is derived from the name.
    pub fn restore(name: impl Into<String>, created_at: DateTime<Utc>, fields: Vec<FieldDescriptor>) -> Self {
        let name = name.into();
        Self { id: format!("form-{name}"), name, created_at, fields, events: vec![] }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn fields(&self) -> &[FieldDescriptor] { &self.fields }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id.as_str() == id)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id.as_str() == id)
    }

    /// Append a field of `field_type` with a fresh id
    pub fn add_field(&mut self, field_type: FieldType) -> &FieldDescriptor {
        let field = FieldDescriptor::new(FieldId::generate(), field_type);
        self.push_field(field)
    }

    /// Append a fully specified field
    pub fn insert_field(&mut self, field: FieldDescriptor) -> Result<&FieldDescriptor> {
        if self.field(field.id.as_str()).is_some() {
            return Err(FormsError::DuplicateField(field.id.to_string()));
        }
        Ok(self.push_field(field))
    }

    fn push_field(&mut self, field: FieldDescriptor) -> &FieldDescriptor {
        self.events.push(FormEvent::FieldAdded { field_id: field.id.clone() });
        self.fields.push(field);
        &self.fields[self.fields.len() - 1]
    }

    /// Replace a field wholesale; the id is kept
    pub fn update_field(&mut self, id: &str, mut updated: FieldDescriptor) -> Result<()> {
        let index = self.require_position(id)?;
        updated.id = self.fields[index].id.clone();
        if updated.derived.as_ref().is_some_and(|d| d.depends_on(id)) {
            return Err(FormsError::SelfDependency(id.to_string()));
        }
        self.fields[index] = updated;
        self.touched(index);
        Ok(())
    }

    /// Remove a field; it is also dropped from every parent list naming it
    pub fn remove_field(&mut self, id: &str) -> Result<FieldDescriptor> {
        let index = self.require_position(id)?;
        let removed = self.fields.remove(index);
        for field in &mut self.fields {
            if let Some(spec) = field.derived.as_mut().filter(|s| s.depends_on(id)) {
                spec.parents.retain(|p| p.as_str() != id);
            }
        }
        self.events.push(FormEvent::FieldRemoved { field_id: removed.id.clone() });
        Ok(removed)
    }

    /// Swap with the previous field; no-op for the first one
    pub fn move_field_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.fields.len() {
            return false;
        }
        self.swap(index, index - 1);
        true
    }

    /// Swap with the next field; no-op for the last one
    pub fn move_field_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.fields.len() {
            return false;
        }
        self.swap(index, index + 1);
        true
    }

    fn swap(&mut self, from: usize, to: usize) {
        self.fields.swap(from, to);
        self.events.push(FormEvent::FieldMoved { field_id: self.fields[to].id.clone(), from, to });
    }

    pub fn add_option(&mut self, id: &str) -> Result<()> {
        let index = self.require_choice(id)?;
        self.fields[index].options.push(FieldOption::plain(""));
        self.touched(index);
        Ok(())
    }

    pub fn set_option(&mut self, id: &str, option: usize, value: FieldOption) -> Result<()> {
        let index = self.require_choice(id)?;
        let slot = self.fields[index]
            .options
            .get_mut(option)
            .ok_or_else(|| FormsError::InvalidSchema(format!("option {option} out of range for {id}")))?;
        *slot = value;
        self.touched(index);
        Ok(())
    }

    pub fn remove_option(&mut self, id: &str, option: usize) -> Result<FieldOption> {
        let index = self.require_choice(id)?;
        if option >= self.fields[index].options.len() {
            return Err(FormsError::InvalidSchema(format!("option {option} out of range for {id}")));
        }
        let removed = self.fields[index].options.remove(option);
        self.touched(index);
        Ok(removed)
    }

    /// Attach an empty derived spec, or drop the existing one
    pub fn toggle_derived(&mut self, id: &str) -> Result<bool> {
        let index = self.require_position(id)?;
        let field = &mut self.fields[index];
        let enabled = match field.derived {
            Some(_) => {
                field.derived = None;
                false
            }
            None => {
                field.derived = Some(DerivedSpec::default());
                true
            }
        };
        self.touched(index);
        Ok(enabled)
    }

    /// Add `parent` to the field's parents, or remove it if present.
    /// Returns whether the parent is now selected.
    pub fn toggle_parent(&mut self, id: &str, parent: &str) -> Result<bool> {
        if id == parent {
            return Err(FormsError::SelfDependency(id.to_string()));
        }
        let parent_id = self
            .field(parent)
            .map(|f| f.id.clone())
            .ok_or_else(|| FormsError::FieldNotFound(parent.to_string()))?;
        let index = self.require_position(id)?;
        let spec = self.fields[index].derived.get_or_insert_with(DerivedSpec::default);
        let selected = if spec.depends_on(parent) {
            spec.parents.retain(|p| p.as_str() != parent);
            false
        } else {
            spec.parents.push(parent_id);
            true
        };
        self.touched(index);
        Ok(selected)
    }

    pub fn set_expression(&mut self, id: &str, expression: impl Into<String>) -> Result<()> {
        let index = self.require_position(id)?;
        self.fields[index]
            .derived
            .get_or_insert_with(DerivedSpec::default)
            .expression = expression.into();
        self.touched(index);
        Ok(())
    }

    /// Fields selectable as parents of `id`
    pub fn candidate_parents(&self, id: &str) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        let id = id.to_string();
        self.fields.iter().filter(move |f| f.id.as_str() != id)
    }

    /// Structural checks: unique ids, no self-dependency, known parents.
    /// Cycles longer than one field are reported at evaluation time.
    pub fn check_integrity(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.id.as_str()) {
                return Err(FormsError::DuplicateField(field.id.to_string()));
            }
        }
        for field in &self.fields {
            let Some(spec) = &field.derived else { continue };
            for parent in &spec.parents {
                if parent == &field.id {
                    return Err(FormsError::SelfDependency(field.id.to_string()));
                }
                if !seen.contains(parent.as_str()) {
                    return Err(FormsError::FieldNotFound(parent.to_string()));
                }
            }
        }
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<FormEvent> {
        std::mem::take(&mut self.events)
    }

    fn require_position(&self, id: &str) -> Result<usize> {
        self.position_of(id).ok_or_else(|| FormsError::FieldNotFound(id.to_string()))
    }

    fn require_choice(&self, id: &str) -> Result<usize> {
        let index = self.require_position(id)?;
        let field_type = self.fields[index].field_type;
        if !field_type.is_choice() {
            return Err(FormsError::InvalidSchema(format!("{field_type} field {id} has no options")));
        }
        Ok(index)
    }

    fn touched(&mut self, index: usize) {
        self.events.push(FormEvent::FieldUpdated { field_id: self.fields[index].id.clone() });
    }
}
