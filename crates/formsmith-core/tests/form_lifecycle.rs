//! End-to-end behaviour: build, persist, reload, preview, submit

use std::collections::HashMap;
use std::sync::Arc;

use formsmith_core::{
    compute_derived, validate, DerivedSpec, EvaluationError, FieldDescriptor, FieldId, FieldType, FileKeyValueStore,
    FormCatalog, FormDescriptor, FormsError, InMemoryKeyValueStore, PasswordRule, PreviewSession, RuleViolation,
    ValidationRules,
};
use serde_json::{json, Value};

fn id(s: &str) -> FieldId {
    FieldId::new(s).unwrap()
}

#[test]
fn not_empty_rejects_blank_and_absent() {
    let rules = ValidationRules::required();
    assert_eq!(validate(&rules, &json!("")), Err(RuleViolation::Required));
    assert_eq!(validate(&rules, &Value::Null), Err(RuleViolation::Required));
    assert_eq!(validate(&rules, &json!("x")), Ok(()));
}

#[test]
fn min_length() {
    let rules = ValidationRules { min_length: Some(3), ..Default::default() };
    assert!(validate(&rules, &json!("ab")).is_err());
    assert!(validate(&rules, &json!("abc")).is_ok());
}

#[test]
fn email_format() {
    let rules = ValidationRules { email: true, ..Default::default() };
    assert!(validate(&rules, &json!("a@b.com")).is_ok());
    assert!(validate(&rules, &json!("a@b")).is_err());
    assert!(validate(&rules, &json!("a b@c.com")).is_err());
}

#[test]
fn password_policy() {
    let rules = ValidationRules {
        password_rule: Some(PasswordRule { min_length: Some(8), require_number: true, require_upper: true }),
        ..Default::default()
    };
    assert_eq!(validate(&rules, &json!("short1A")), Err(RuleViolation::PasswordTooShort(8)));
    assert_eq!(validate(&rules, &json!("longenoughA")), Err(RuleViolation::PasswordMissingDigit));
    assert_eq!(validate(&rules, &json!("longenough1")), Err(RuleViolation::PasswordMissingUppercase));
    assert_eq!(validate(&rules, &json!("Longenough1")), Ok(()));
}

#[test]
fn derived_sum() {
    let spec = DerivedSpec::new(vec![id("a"), id("b")], "a + b");
    let values = HashMap::from([(id("a"), json!(2)), (id("b"), json!(3))]);
    assert_eq!(compute_derived(&spec, &values), Ok(json!(5)));
}

#[test]
fn derived_cycle_reported_for_both() {
    let mut form = FormDescriptor::create("cycle");
    form.insert_field(
        FieldDescriptor::new(id("a"), FieldType::Number).with_derived(DerivedSpec::new(vec![id("b")], "b + 1")),
    )
    .unwrap();
    form.insert_field(
        FieldDescriptor::new(id("b"), FieldType::Number).with_derived(DerivedSpec::new(vec![id("a")], "a + 1")),
    )
    .unwrap();

    let session = PreviewSession::new(form);
    let errors = session.derived_errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.values().all(|e| matches!(e, EvaluationError::Cycle { .. })));
}

fn profile_form() -> FormDescriptor {
    let mut form = FormDescriptor::create("Profile");
    form.insert_field(
        FieldDescriptor::new(id("name"), FieldType::Text).with_label("Name").with_required(true),
    )
    .unwrap();
    form.insert_field(
        FieldDescriptor::new(id("email"), FieldType::Text)
            .with_label("Email")
            .with_validation(ValidationRules { email: true, ..Default::default() }),
    )
    .unwrap();
    form.insert_field(FieldDescriptor::new(id("dob"), FieldType::Date).with_label("Date of birth")).unwrap();
    form.insert_field(
        FieldDescriptor::new(id("age"), FieldType::Number)
            .with_label("Age")
            .with_derived(DerivedSpec::new(vec![id("dob")], "dob ? years_between(dob, today()) : ''")),
    )
    .unwrap();
    form
}

#[tokio::test]
async fn save_then_load_reproduces_form() {
    let catalog = FormCatalog::new(Arc::new(InMemoryKeyValueStore::new()));
    let form = profile_form();
    catalog.save(&form).await.unwrap();

    let loaded = catalog.require("Profile").await.unwrap();
    assert_eq!(loaded.fields(), form.fields());
    assert_eq!(loaded.created_at(), form.created_at());
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let form = profile_form();
    {
        let store = FileKeyValueStore::open(dir.path()).await.unwrap();
        FormCatalog::new(Arc::new(store)).save(&form).await.unwrap();
    }

    let store = FileKeyValueStore::open(dir.path()).await.unwrap();
    let catalog = FormCatalog::new(Arc::new(store));
    let listed = catalog.list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Profile");
    assert_eq!(listed[0].created_at, form.created_at());
    assert_eq!(catalog.require("Profile").await.unwrap().fields(), form.fields());
}

#[test]
fn empty_required_field_blocks_submission_alone() {
    let mut session = PreviewSession::new(profile_form());
    session.set_input("email", "ada@example.com").unwrap();
    session.set_input("dob", "1990-01-01").unwrap();

    assert!(matches!(session.submit(), Err(FormsError::ValidationFailed(1))));
    assert_eq!(session.errors().len(), 1);
    assert_eq!(session.error("name"), Some(&RuleViolation::Required));
    assert!(session.error("email").is_none());

    session.set_input("name", "Ada").unwrap();
    let submission = session.submit().unwrap();
    assert!(session.errors().is_empty());
    assert!(submission.responses["age"].as_i64().is_some_and(|age| age >= 34));
}
