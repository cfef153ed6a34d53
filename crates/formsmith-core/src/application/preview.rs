//! Preview state loop
//!
//! One [`PreviewSession`] per rendered form. It owns the live value map and
//! the error maps; every edit recomputes all derived fields, and validation
//! runs only on [`PreviewSession::submit`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::aggregates::{FieldDescriptor, FormDescriptor};
use crate::domain::services::{validate_all, DerivedPlan, RuleViolation};
use crate::domain::value_objects::FieldId;
use crate::error::{FormsError, Result};
use crate::expression::EvaluationError;

/// Accepted submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub id: Uuid,
    pub form_name: String,
    pub responses: BTreeMap<FieldId, Value>,
    pub submitted_at: DateTime<Utc>,
}

/// Live state of one previewed form
#[derive(Debug, Clone)]
pub struct PreviewSession {
    form: FormDescriptor,
    plan: DerivedPlan,
    today: NaiveDate,
    values: HashMap<FieldId, Value>,
    errors: BTreeMap<FieldId, RuleViolation>,
    derived_errors: BTreeMap<FieldId, EvaluationError>,
}

impl PreviewSession {
    pub fn new(form: FormDescriptor) -> Self {
        Self::at(form, Utc::now().date_naive())
    }

    /// Session whose `today()` is fixed to `today`
    pub fn at(form: FormDescriptor, today: NaiveDate) -> Self {
        let plan = DerivedPlan::build(form.fields());
        let mut session = Self {
            form,
            plan,
            today,
            values: HashMap::new(),
            errors: BTreeMap::new(),
            derived_errors: BTreeMap::new(),
        };
        session.reset();
        session
    }

    pub fn form(&self) -> &FormDescriptor {
        &self.form
    }

    /// Back to the seeded defaults, with errors cleared
    pub fn reset(&mut self) {
        self.values = self
            .form
            .fields()
            .iter()
            .filter_map(|f| f.initial_value().map(|v| (f.id.clone(), v.clone())))
            .collect();
        self.errors.clear();
        self.recompute();
    }

    /// Set a user-entered value, then recompute derived fields
    pub fn set_value(&mut self, id: &str, value: Value) -> Result<()> {
        let field = self.editable(id)?;
        let key = field.id.clone();
        debug!(field = id, %value, "value changed");
        self.values.insert(key, value);
        self.recompute();
        Ok(())
    }

    /// [`set_value`](Self::set_value) from raw text, shaped by the field type
    pub fn set_input(&mut self, id: &str, raw: &str) -> Result<()> {
        let value = self.editable(id)?.field_type.coerce_input(raw);
        self.set_value(id, value)
    }

    /// Check or uncheck one value of a checkbox group
    pub fn toggle_choice(&mut self, id: &str, choice: &str, checked: bool) -> Result<()> {
        let field = self.editable(id)?;
        if !field.field_type.is_multi() {
            return Err(FormsError::InvalidSchema(format!("{} field {id} is not a checkbox group", field.field_type)));
        }
        let mut selected: Vec<Value> = match self.values.get(id) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let present = selected.iter().any(|v| v.as_str() == Some(choice));
        if checked && !present {
            selected.push(Value::String(choice.to_string()));
        } else if !checked {
            selected.retain(|v| v.as_str() != Some(choice));
        }
        self.set_value(id, Value::Array(selected))
    }

    pub fn value(&self, id: &str) -> Option<&Value> {
        self.values.get(id)
    }

    pub fn values(&self) -> &HashMap<FieldId, Value> {
        &self.values
    }

    /// What the field shows: current value, else its default, else empty
    pub fn display_value(&self, id: &str) -> Value {
        if let Some(value) = self.values.get(id) {
            return value.clone();
        }
        match self.form.field(id).map(|f| &f.default_value) {
            Some(Value::Null) | None => Value::String(String::new()),
            Some(default) => default.clone(),
        }
    }

    /// Validation errors from the last submit
    pub fn errors(&self) -> &BTreeMap<FieldId, RuleViolation> {
        &self.errors
    }

    pub fn error(&self, id: &str) -> Option<&RuleViolation> {
        self.errors.get(id)
    }

    /// Derived fields that failed in the last recompute
    pub fn derived_errors(&self) -> &BTreeMap<FieldId, EvaluationError> {
        &self.derived_errors
    }

    /// Validate every field. Any failure blocks the whole submission and
    /// leaves the per-field messages in [`errors`](Self::errors).
    pub fn submit(&mut self) -> Result<FormSubmission> {
        self.errors = validate_all(self.form.fields(), &self.values);
        if !self.errors.is_empty() {
            info!(form = self.form.name(), failed = self.errors.len(), "submission blocked");
            return Err(FormsError::ValidationFailed(self.errors.len()));
        }

        let responses = self
            .form
            .fields()
            .iter()
            .map(|f| (f.id.clone(), self.values.get(&f.id).cloned().unwrap_or(Value::Null)))
            .collect();
        let submission = FormSubmission {
            id: Uuid::new_v4(),
            form_name: self.form.name().to_string(),
            responses,
            submitted_at: Utc::now(),
        };
        info!(form = self.form.name(), submission = %submission.id, "form submitted");
        Ok(submission)
    }

    fn editable(&self, id: &str) -> Result<&FieldDescriptor> {
        let field = self.form.field(id).ok_or_else(|| FormsError::FieldNotFound(id.to_string()))?;
        if field.is_derived() {
            return Err(FormsError::ReadOnlyField(id.to_string()));
        }
        Ok(field)
    }

    fn recompute(&mut self) {
        if self.plan.is_empty() {
            return;
        }
        self.derived_errors = self.plan.recompute(self.form.fields(), &mut self.values, self.today);
    }
}
