//! Validation evaluator
//!
//! Checks run in a fixed order and the first failure wins:
//! non-empty, min length, max length, email, password (length, digit,
//! uppercase), then the bounds for the field's declared type. An absent
//! value (`null`) is only subject to the non-empty check. Entered text and
//! selections, including empty ones, run every rule.

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use thiserror::Error;

use crate::domain::aggregates::FieldDescriptor;
use crate::domain::value_objects::{FieldId, FieldType, PasswordRule, ValidationRules};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// A failed check. The display text is the message shown next to the field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleViolation {
    #[error("This field is required.")]
    Required,
    #[error("Minimum length is {0}.")]
    TooShort(usize),
    #[error("Maximum length is {0}.")]
    TooLong(usize),
    #[error("Invalid email format.")]
    InvalidEmail,
    #[error("Password must be at least {0} characters.")]
    PasswordTooShort(usize),
    #[error("Password must contain a number.")]
    PasswordMissingDigit,
    #[error("Password must contain an uppercase letter.")]
    PasswordMissingUppercase,
    #[error("Value must be a number.")]
    NotANumber,
    #[error("Minimum value is {0}.")]
    BelowMinimum(f64),
    #[error("Maximum value is {0}.")]
    AboveMaximum(f64),
    #[error("Invalid date.")]
    InvalidDate,
    #[error("Date must be on or after {0}.")]
    DateTooEarly(NaiveDate),
    #[error("Date must be on or before {0}.")]
    DateTooLate(NaiveDate),
}

/// Check `value` against `rules` without knowing the field type.
///
/// Numeric bounds apply when the value is a JSON number; date bounds need
/// the declared type, see [`validate_field`].
pub fn validate(rules: &ValidationRules, value: &Value) -> Result<(), RuleViolation> {
    check_presence(rules.not_empty, value)?;
    if value.is_null() {
        return Ok(());
    }
    check_text(rules, value)?;
    if let Some(n) = value.as_f64() {
        check_bounds(rules, n)?;
    }
    Ok(())
}

/// Check a field's current value, dispatching bound checks on its type.
/// The `required` flag is enforced as a non-empty check. An empty number
/// or date input has nothing to bound and passes.
pub fn validate_field(field: &FieldDescriptor, value: &Value) -> Result<(), RuleViolation> {
    let rules = &field.validation;
    check_presence(rules.not_empty || field.required, value)?;
    match field.field_type {
        FieldType::Number if !is_blank(value) => check_bounds(rules, read_number(value)?),
        FieldType::Date if !is_blank(value) => check_dates(rules, read_date(value)?),
        FieldType::Number | FieldType::Date => Ok(()),
        _ if value.is_null() => Ok(()),
        _ => check_text(rules, value),
    }
}

/// Validate every field; the map holds only failing fields
pub fn validate_all(
    fields: &[FieldDescriptor],
    values: &HashMap<FieldId, Value>,
) -> BTreeMap<FieldId, RuleViolation> {
    fields
        .iter()
        .filter_map(|field| {
            let value = values.get(&field.id).unwrap_or(&Value::Null);
            validate_field(field, value).err().map(|violation| (field.id.clone(), violation))
        })
        .collect()
}

/// Empty means absent, blank after trimming, or an empty selection
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn check_presence(required: bool, value: &Value) -> Result<(), RuleViolation> {
    if required && is_blank(value) {
        return Err(RuleViolation::Required);
    }
    Ok(())
}

fn check_text(rules: &ValidationRules, value: &Value) -> Result<(), RuleViolation> {
    if let Some(len) = measure(value) {
        if let Some(min) = rules.min_length.filter(|m| *m > 0) {
            if len < min {
                return Err(RuleViolation::TooShort(min));
            }
        }
        if let Some(max) = rules.max_length.filter(|m| *m > 0) {
            if len > max {
                return Err(RuleViolation::TooLong(max));
            }
        }
    }
    if rules.email && !EMAIL.is_match(&as_text(value)) {
        return Err(RuleViolation::InvalidEmail);
    }
    if let Some(policy) = &rules.password_rule {
        check_password(policy, &as_text(value))?;
    }
    Ok(())
}

fn check_password(policy: &PasswordRule, text: &str) -> Result<(), RuleViolation> {
    if let Some(min) = policy.min_length.filter(|m| *m > 0) {
        if text.chars().count() < min {
            return Err(RuleViolation::PasswordTooShort(min));
        }
    }
    if policy.require_number && !text.chars().any(|c| c.is_ascii_digit()) {
        return Err(RuleViolation::PasswordMissingDigit);
    }
    if policy.require_upper && !text.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(RuleViolation::PasswordMissingUppercase);
    }
    Ok(())
}

fn check_bounds(rules: &ValidationRules, n: f64) -> Result<(), RuleViolation> {
    if let Some(min) = rules.min {
        if n < min {
            return Err(RuleViolation::BelowMinimum(min));
        }
    }
    if let Some(max) = rules.max {
        if n > max {
            return Err(RuleViolation::AboveMaximum(max));
        }
    }
    Ok(())
}

fn check_dates(rules: &ValidationRules, date: NaiveDate) -> Result<(), RuleViolation> {
    if let Some(min) = rules.min_date {
        if date < min {
            return Err(RuleViolation::DateTooEarly(min));
        }
    }
    if let Some(max) = rules.max_date {
        if date > max {
            return Err(RuleViolation::DateTooLate(max));
        }
    }
    Ok(())
}

/// Length of strings (in characters) and selections; numbers have none
fn measure(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn read_number(value: &Value) -> Result<f64, RuleViolation> {
    match value {
        Value::Number(n) => n.as_f64().ok_or(RuleViolation::NotANumber),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or(RuleViolation::NotANumber),
        _ => Err(RuleViolation::NotANumber),
    }
}

fn read_date(value: &Value) -> Result<NaiveDate, RuleViolation> {
    let Value::String(s) = value else {
        return Err(RuleViolation::InvalidDate);
    };
    let s = s.trim();
    NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").map_err(|_| RuleViolation::InvalidDate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> ValidationRules {
        ValidationRules::default()
    }

    fn field(field_type: FieldType, rules: ValidationRules) -> FieldDescriptor {
        FieldDescriptor::new(FieldId::new("f").unwrap(), field_type).with_validation(rules)
    }

    #[test]
    fn test_not_empty() {
        let r = ValidationRules::required();
        assert_eq!(validate(&r, &json!("")), Err(RuleViolation::Required));
        assert_eq!(validate(&r, &json!("   ")), Err(RuleViolation::Required));
        assert_eq!(validate(&r, &Value::Null), Err(RuleViolation::Required));
        assert_eq!(validate(&r, &json!([])), Err(RuleViolation::Required));
        assert_eq!(validate(&r, &json!("x")), Ok(()));
        assert_eq!(validate(&r, &json!(0)), Ok(()));
    }

    #[test]
    fn test_length() {
        let r = ValidationRules { min_length: Some(3), max_length: Some(5), ..rules() };
        assert_eq!(validate(&r, &json!("ab")), Err(RuleViolation::TooShort(3)));
        assert_eq!(validate(&r, &json!("abc")), Ok(()));
        assert_eq!(validate(&r, &json!("abcdef")), Err(RuleViolation::TooLong(5)));
        assert_eq!(validate(&r, &json!("äöü")), Ok(()));
        // numbers have no length
        assert_eq!(validate(&r, &json!(7)), Ok(()));
        assert_eq!(validate(&r, &Value::Null), Ok(()));
        // empty input still has a length
        assert_eq!(validate(&r, &json!("")), Err(RuleViolation::TooShort(3)));
        assert_eq!(validate(&r, &json!("  ")), Err(RuleViolation::TooShort(3)));
    }

    #[test]
    fn test_first_failure_wins() {
        let r = ValidationRules { not_empty: true, min_length: Some(10), email: true, ..rules() };
        assert_eq!(validate(&r, &json!("")), Err(RuleViolation::Required));
        assert_eq!(validate(&r, &json!("a@b")), Err(RuleViolation::TooShort(10)));
        assert_eq!(validate(&r, &json!("aaaaaaaaa@b")), Err(RuleViolation::InvalidEmail));
    }

    #[test]
    fn test_email() {
        let r = ValidationRules { email: true, ..rules() };
        assert_eq!(validate(&r, &json!("a@b.com")), Ok(()));
        assert_eq!(validate(&r, &json!("a@b")), Err(RuleViolation::InvalidEmail));
        assert_eq!(validate(&r, &json!("a b@c.com")), Err(RuleViolation::InvalidEmail));
        assert_eq!(validate(&r, &json!("a@@b.com")), Err(RuleViolation::InvalidEmail));
        assert_eq!(validate(&r, &json!("")), Err(RuleViolation::InvalidEmail));
        assert_eq!(validate(&r, &Value::Null), Ok(()));
    }

    #[test]
    fn test_empty_text_field_runs_rules() {
        let f = field(FieldType::Text, ValidationRules { min_length: Some(2), ..rules() });
        assert_eq!(validate_field(&f, &json!("")), Err(RuleViolation::TooShort(2)));
        assert_eq!(validate_field(&f, &Value::Null), Ok(()));

        let picks = field(FieldType::Checkbox, ValidationRules { min_length: Some(1), ..rules() });
        assert_eq!(validate_field(&picks, &json!([])), Err(RuleViolation::TooShort(1)));

        let secret = field(
            FieldType::Text,
            ValidationRules { password_rule: Some(PasswordRule { min_length: Some(8), ..Default::default() }), ..rules() },
        );
        assert_eq!(validate_field(&secret, &json!("")), Err(RuleViolation::PasswordTooShort(8)));
    }

    #[test]
    fn test_password_policy() {
        let r = ValidationRules {
            password_rule: Some(PasswordRule { min_length: Some(8), require_number: true, require_upper: true }),
            ..rules()
        };
        assert_eq!(validate(&r, &json!("short1A")), Err(RuleViolation::PasswordTooShort(8)));
        assert_eq!(validate(&r, &json!("longenoughA")), Err(RuleViolation::PasswordMissingDigit));
        assert_eq!(validate(&r, &json!("longenough1")), Err(RuleViolation::PasswordMissingUppercase));
        assert_eq!(validate(&r, &json!("Longenough1")), Ok(()));
    }

    #[test]
    fn test_number_field_bounds() {
        let f = field(FieldType::Number, ValidationRules { min: Some(18.0), max: Some(99.0), ..rules() });
        assert_eq!(validate_field(&f, &json!(17)), Err(RuleViolation::BelowMinimum(18.0)));
        assert_eq!(validate_field(&f, &json!("42")), Ok(()));
        assert_eq!(validate_field(&f, &json!(100.5)), Err(RuleViolation::AboveMaximum(99.0)));
        assert_eq!(validate_field(&f, &json!("abc")), Err(RuleViolation::NotANumber));
        assert_eq!(validate_field(&f, &json!("")), Ok(()));
        assert_eq!(RuleViolation::BelowMinimum(18.0).to_string(), "Minimum value is 18.");
    }

    #[test]
    fn test_date_field_bounds() {
        let f = field(
            FieldType::Date,
            ValidationRules {
                min_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                max_date: NaiveDate::from_ymd_opt(2024, 12, 31),
                ..rules()
            },
        );
        assert_eq!(validate_field(&f, &json!("2024-06-01")), Ok(()));
        assert!(matches!(validate_field(&f, &json!("2023-12-31")), Err(RuleViolation::DateTooEarly(_))));
        assert!(matches!(validate_field(&f, &json!("2025-01-01")), Err(RuleViolation::DateTooLate(_))));
        assert_eq!(validate_field(&f, &json!("01/02/2024")), Err(RuleViolation::InvalidDate));
        assert_eq!(
            RuleViolation::DateTooEarly(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).to_string(),
            "Date must be on or after 2024-01-01."
        );
    }

    #[test]
    fn test_required_flag_and_selections() {
        let f = field(FieldType::Checkbox, rules()).with_required(true);
        assert_eq!(validate_field(&f, &json!([])), Err(RuleViolation::Required));
        assert_eq!(validate_field(&f, &json!(["a"])), Ok(()));

        let limited = field(FieldType::Checkbox, ValidationRules { max_length: Some(1), ..rules() });
        assert_eq!(validate_field(&limited, &json!(["a", "b"])), Err(RuleViolation::TooLong(1)));
    }

    #[test]
    fn test_validate_all_reports_only_failures() {
        let fields = vec![
            FieldDescriptor::new(FieldId::new("name").unwrap(), FieldType::Text).with_required(true),
            FieldDescriptor::new(FieldId::new("bio").unwrap(), FieldType::Textarea),
        ];
        let values = HashMap::from([(FieldId::new("bio").unwrap(), json!("hi"))]);
        let errors = validate_all(&fields, &values);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("name"), Some(&RuleViolation::Required));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn min_length_matches_char_count(text in "\\PC{0,20}", min in 1usize..15) {
                let r = ValidationRules { min_length: Some(min), ..ValidationRules::default() };
                let passes = validate(&r, &Value::String(text.clone())).is_ok();
                prop_assert_eq!(passes, text.chars().count() >= min);
            }

            #[test]
            fn whitespace_only_is_blank(spaces in "[ \\t\\n]{0,8}") {
                prop_assert_eq!(validate(&ValidationRules::required(), &json!(spaces)), Err(RuleViolation::Required));
            }
        }
    }
}
