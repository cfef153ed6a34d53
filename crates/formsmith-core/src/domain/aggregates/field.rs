//! Field descriptor
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::value_objects::{DerivedSpec, FieldId, FieldOption, FieldType, ValidationRules};

/// Schema-level definition of one form field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: FieldId,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub validation: ValidationRules,
    #[serde(default)]
    pub derived: Option<DerivedSpec>,
}

impl FieldDescriptor {
    /// New field with builder defaults
    pub fn new(id: FieldId, field_type: FieldType) -> Self {
        Self {
            id,
            field_type,
            label: "New Field".into(),
            name: "example".into(),
            required: false,
            default_value: Value::String(String::new()),
            options: Vec::new(),
            validation: ValidationRules::default(),
            derived: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_validation(mut self, rules: ValidationRules) -> Self {
        self.validation = rules;
        self
    }

    pub fn with_derived(mut self, spec: DerivedSpec) -> Self {
        self.derived = Some(spec);
        self
    }

    /// Active derived spec, if this field is computed
    pub fn derived_spec(&self) -> Option<&DerivedSpec> {
        self.derived.as_ref().filter(|d| d.is_active())
    }

    /// Computed fields are read-only in the preview
    pub fn is_derived(&self) -> bool {
        self.derived_spec().is_some()
    }

    /// Default value if it holds something worth seeding
    pub fn initial_value(&self) -> Option<&Value> {
        match &self.default_value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            other => Some(other),
        }
    }
}
