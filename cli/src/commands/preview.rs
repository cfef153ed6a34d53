//! Preview command

use anyhow::bail;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tabled::Tabled;

use formsmith_core::{FormCatalog, FormsError, PreviewSession};

use crate::output::OutputFormat;

#[derive(Tabled)]
struct PreviewRow {
    id: String,
    label: String,
    value: String,
    status: String,
}

#[derive(Serialize)]
struct PreviewState {
    form: String,
    values: BTreeMap<String, Value>,
    errors: BTreeMap<String, String>,
    derived_errors: BTreeMap<String, String>,
}

/// `--set` argument: `<field-id>=<value>`
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((id, value)) if !id.trim().is_empty() => Ok((id.trim().to_string(), value.to_string())),
        _ => Err(format!("expected <field-id>=<value>, got '{s}'")),
    }
}

pub async fn handle(
    catalog: &FormCatalog,
    name: &str,
    inputs: &[(String, String)],
    submit: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let form = catalog.require(name).await?;
    let mut session = PreviewSession::new(form);
    for (id, raw) in inputs {
        session.set_input(id, raw)?;
    }

    if !submit {
        return print_state(&session, format);
    }
    match session.submit() {
        Ok(submission) => {
            format.print(&submission, || {
                submission
                    .responses
                    .iter()
                    .map(|(id, value)| PreviewRow {
                        id: id.to_string(),
                        label: session.form().field(id.as_str()).map(|f| f.label.clone()).unwrap_or_default(),
                        value: show(value),
                        status: String::new(),
                    })
                    .collect()
            })?;
            println!("{}", "Form submitted successfully!".green().bold());
            Ok(())
        }
        Err(FormsError::ValidationFailed(count)) => {
            print_state(&session, format)?;
            bail!("submission blocked: {count} field(s) failed validation")
        }
        Err(e) => Err(e.into()),
    }
}

fn print_state(session: &PreviewSession, format: OutputFormat) -> anyhow::Result<()> {
    let fields = session.form().fields();
    let state = PreviewState {
        form: session.form().name().to_string(),
        values: fields.iter().map(|f| (f.id.to_string(), session.display_value(f.id.as_str()))).collect(),
        errors: session.errors().iter().map(|(id, e)| (id.to_string(), e.to_string())).collect(),
        derived_errors: session.derived_errors().iter().map(|(id, e)| (id.to_string(), e.to_string())).collect(),
    };
    format.print(&state, || {
        fields
            .iter()
            .map(|f| {
                let status = match (session.error(f.id.as_str()), session.derived_errors().get(&f.id)) {
                    (Some(violation), _) => violation.to_string(),
                    (None, Some(error)) => format!("not computed: {error}"),
                    (None, None) if f.is_derived() => "computed".to_string(),
                    (None, None) => String::new(),
                };
                PreviewRow {
                    id: f.id.to_string(),
                    label: if f.required { format!("{} *", f.label) } else { f.label.clone() },
                    value: show(&session.display_value(f.id.as_str())),
                    status,
                }
            })
            .collect()
    })
}

fn show(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(show).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("age=42"), Ok(("age".into(), "42".into())));
        assert_eq!(parse_assignment("expr=a=b"), Ok(("expr".into(), "a=b".into())));
        assert_eq!(parse_assignment("empty="), Ok(("empty".into(), String::new())));
        assert!(parse_assignment("=x").is_err());
        assert!(parse_assignment("novalue").is_err());
    }

    #[test]
    fn test_show() {
        assert_eq!(show(&json!(["cat", "dog"])), "cat, dog");
        assert_eq!(show(&json!(2.5)), "2.5");
        assert_eq!(show(&Value::Null), "");
    }
}
