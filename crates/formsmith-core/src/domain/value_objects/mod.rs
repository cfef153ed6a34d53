//! Value Objects - schema-level primitives
//!
//! Field ids, field types, choice options, validation rules and derived
//! specs. Serialized field names follow the stored record layout
//! (`camelCase`), so records written by earlier builders load unchanged.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt;

use crate::error::{FormsError, Result};

/// Field identifier (Value Object)
///
/// # Invariants
/// - Non-empty
/// - Unique within a form (enforced by the form aggregate)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldId(String);

impl FieldId {
    /// Create field id with validation
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(FormsError::InvalidSchema("field id cannot be empty".into()));
        }
        Ok(Self(id))
    }

    /// Fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FieldId {
    type Error = FormsError;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl From<FieldId> for String {
    fn from(id: FieldId) -> Self {
        id.0
    }
}

impl Borrow<str> for FieldId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared field type, the discriminant of a field descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Short text
    Text,
    /// Long text
    Textarea,
    Number,
    /// Single select (dropdown)
    Select,
    /// Single choice
    Radio,
    /// Multi-select checkbox group
    Checkbox,
    Date,
}

impl FieldType {
    /// All field types, in builder palette order
    pub const ALL: [FieldType; 7] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Textarea,
        FieldType::Select,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
        }
    }

    /// Text-like types take length rules
    pub fn is_text(&self) -> bool {
        matches!(self, FieldType::Text | FieldType::Textarea)
    }

    /// Choice types carry options
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio | FieldType::Checkbox)
    }

    /// Checkbox groups hold an array of selected values
    pub fn is_multi(&self) -> bool {
        matches!(self, FieldType::Checkbox)
    }

    /// Convert raw user input into the value shape this type stores.
    ///
    /// Numbers that fail to parse stay strings so validation can report them.
    pub fn coerce_input(&self, raw: &str) -> Value {
        match self {
            FieldType::Number => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Value::String(String::new());
                }
                match trimmed.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                    Some(n) => match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::from(f as i64),
                        _ => Value::Number(n),
                    },
                    None => Value::String(raw.to_string()),
                }
            }
            FieldType::Checkbox => Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
            _ => Value::String(raw.to_string()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = FormsError;

    fn from_str(s: &str) -> Result<Self> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FormsError::InvalidSchema(format!("unknown field type: {s}")))
    }
}

/// Choice option (label/value pair)
///
/// Older records store options as bare strings; those load as a pair
/// with identical label and value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOption")]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into() }
    }

    /// Option whose label doubles as its value
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        Self { label: text.clone(), value: text }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Plain(String),
    Pair { label: String, value: String },
}

impl From<RawOption> for FieldOption {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Plain(text) => FieldOption::plain(text),
            RawOption::Pair { label, value } => FieldOption { label, value },
        }
    }
}

/// Password policy sub-record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub require_number: bool,
    #[serde(default)]
    pub require_upper: bool,
}

/// Declarative constraint set; an absent constraint is not enforced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default)]
    pub not_empty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub email: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_rule: Option<PasswordRule>,
    /// Numeric lower bound (number fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Numeric upper bound (number fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Earliest accepted date (date fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_date: Option<NaiveDate>,
    /// Latest accepted date (date fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<NaiveDate>,
}

impl ValidationRules {
    pub fn required() -> Self {
        Self { not_empty: true, ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Declares a field whose value is computed from other fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedSpec {
    /// Parent field ids, in selection order
    #[serde(default)]
    pub parents: Vec<FieldId>,
    /// Expression referencing parents by id
    #[serde(default)]
    pub expression: String,
}

impl DerivedSpec {
    pub fn new(parents: Vec<FieldId>, expression: impl Into<String>) -> Self {
        Self { parents, expression: expression.into() }
    }

    /// A spec with a blank expression computes nothing
    pub fn is_active(&self) -> bool {
        !self.expression.trim().is_empty()
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.parents.iter().any(|p| p.as_str() == id)
    }
}
