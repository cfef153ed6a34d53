//! Output formatting

use clap::ValueEnum;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use formsmith_core::{FieldDescriptor, ValidationRules};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Print `data`, using `rows` when the format is a table
    pub fn print<T: Serialize, R: Tabled>(&self, data: &T, rows: impl FnOnce() -> Vec<R>) -> anyhow::Result<()> {
        match self {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data)?),
            OutputFormat::Table => {
                let rows = rows();
                if rows.is_empty() {
                    println!("(none)");
                } else {
                    println!("{}", Table::new(rows).with(Style::rounded()));
                }
            }
        }
        Ok(())
    }
}

#[derive(Tabled)]
pub struct FieldRow {
    #[tabled(rename = "#")]
    pub position: usize,
    pub id: String,
    #[tabled(rename = "type")]
    pub field_type: String,
    pub label: String,
    pub required: String,
    pub rules: String,
    pub derived: String,
}

impl FieldRow {
    pub fn new(position: usize, field: &FieldDescriptor) -> Self {
        Self {
            position,
            id: field.id.to_string(),
            field_type: field.field_type.to_string(),
            label: field.label.clone(),
            required: if field.required { "yes".into() } else { String::new() },
            rules: describe_rules(&field.validation),
            derived: field
                .derived_spec()
                .map(|d| {
                    let parents: Vec<&str> = d.parents.iter().map(|p| p.as_str()).collect();
                    format!("{} <- [{}]", d.expression, parents.join(", "))
                })
                .unwrap_or_default(),
        }
    }
}

/// Compact one-line summary of the enforced rules
pub fn describe_rules(rules: &ValidationRules) -> String {
    let mut parts = Vec::new();
    if rules.not_empty {
        parts.push("not empty".to_string());
    }
    if let Some(n) = rules.min_length {
        parts.push(format!("min length {n}"));
    }
    if let Some(n) = rules.max_length {
        parts.push(format!("max length {n}"));
    }
    if rules.email {
        parts.push("email".to_string());
    }
    if let Some(password) = &rules.password_rule {
        let mut policy = vec![format!("{}+ chars", password.min_length.unwrap_or(0))];
        if password.require_number {
            policy.push("digit".into());
        }
        if password.require_upper {
            policy.push("uppercase".into());
        }
        parts.push(format!("password({})", policy.join(", ")));
    }
    if let Some(n) = rules.min {
        parts.push(format!(">= {n}"));
    }
    if let Some(n) = rules.max {
        parts.push(format!("<= {n}"));
    }
    if let Some(d) = rules.min_date {
        parts.push(format!("from {d}"));
    }
    if let Some(d) = rules.max_date {
        parts.push(format!("until {d}"));
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use formsmith_core::PasswordRule;

    #[test]
    fn test_describe_rules() {
        assert_eq!(describe_rules(&ValidationRules::default()), "");
        let rules = ValidationRules {
            min_length: Some(3),
            email: true,
            password_rule: Some(PasswordRule { min_length: Some(8), require_number: true, require_upper: false }),
            ..ValidationRules::required()
        };
        assert_eq!(describe_rules(&rules), "not empty, min length 3, email, password(8+ chars, digit)");
    }
}
