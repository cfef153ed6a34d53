//! Field editing commands
//!
//! Each command loads the form, applies one builder operation and saves it
//! back whole.

use anyhow::{anyhow, bail};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use colored::Colorize;

use formsmith_core::{
    EvaluationError, FieldDescriptor, FieldId, FieldOption, FieldType, FormCatalog, FormDescriptor, FormEvent,
    PasswordRule, PreviewSession,
};

use super::forms::field_rows;
use crate::output::OutputFormat;
use crate::FieldCommands;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Default, Args)]
pub struct RuleArgs {
    #[arg(long)]
    pub required: Option<bool>,
    #[arg(long)]
    pub not_empty: Option<bool>,
    #[arg(long)]
    pub min_length: Option<usize>,
    #[arg(long)]
    pub max_length: Option<usize>,
    #[arg(long)]
    pub email: Option<bool>,
    /// Minimum password length; enables the password policy
    #[arg(long)]
    pub password_min: Option<usize>,
    #[arg(long)]
    pub password_number: Option<bool>,
    #[arg(long)]
    pub password_upper: Option<bool>,
    /// Drop the password policy
    #[arg(long, conflicts_with_all = ["password_min", "password_number", "password_upper"])]
    pub no_password: bool,
    #[arg(long)]
    pub min: Option<f64>,
    #[arg(long)]
    pub max: Option<f64>,
    #[arg(long)]
    pub min_date: Option<NaiveDate>,
    #[arg(long)]
    pub max_date: Option<NaiveDate>,
    /// Remove every rule before applying the others
    #[arg(long)]
    pub clear: bool,
}

impl RuleArgs {
    fn apply(self, field: &mut FieldDescriptor) {
        let rules = &mut field.validation;
        if self.clear {
            *rules = Default::default();
        }
        if let Some(required) = self.required {
            field.required = required;
        }
        if let Some(v) = self.not_empty {
            rules.not_empty = v;
        }
        if self.min_length.is_some() {
            rules.min_length = self.min_length;
        }
        if self.max_length.is_some() {
            rules.max_length = self.max_length;
        }
        if let Some(v) = self.email {
            rules.email = v;
        }
        if self.no_password {
            rules.password_rule = None;
        } else if self.password_min.is_some() || self.password_number.is_some() || self.password_upper.is_some() {
            let policy = rules.password_rule.get_or_insert_with(PasswordRule::default);
            if self.password_min.is_some() {
                policy.min_length = self.password_min;
            }
            if let Some(v) = self.password_number {
                policy.require_number = v;
            }
            if let Some(v) = self.password_upper {
                policy.require_upper = v;
            }
        }
        if self.min.is_some() {
            rules.min = self.min;
        }
        if self.max.is_some() {
            rules.max = self.max;
        }
        if self.min_date.is_some() {
            rules.min_date = self.min_date;
        }
        if self.max_date.is_some() {
            rules.max_date = self.max_date;
        }
    }
}

pub fn parse_field_type(s: &str) -> Result<FieldType, String> {
    s.parse::<FieldType>().map_err(|e| e.to_string())
}

pub async fn handle(action: FieldCommands, catalog: &FormCatalog, format: OutputFormat) -> anyhow::Result<()> {
    let name = match &action {
        FieldCommands::Add { form, .. }
        | FieldCommands::Remove { form, .. }
        | FieldCommands::Move { form, .. }
        | FieldCommands::Options { form, .. }
        | FieldCommands::Derive { form, .. }
        | FieldCommands::Rules { form, .. } => form.clone(),
    };
    let mut form = catalog.require(&name).await?;
    apply(&mut form, action)?;
    catalog.save(&form).await?;

    for event in form.take_events() {
        tracing::debug!(event = event.event_type(), form = %name, "field change");
        println!("{}", describe(&event));
    }
    warn_on_derived_errors(&form);
    format.print(&form.fields(), || field_rows(&form))
}

fn apply(form: &mut FormDescriptor, action: FieldCommands) -> anyhow::Result<()> {
    match action {
        FieldCommands::Add { field_type, label, required, default, .. } => {
            let mut field = FieldDescriptor::new(FieldId::generate(), field_type).with_required(required);
            if let Some(label) = label {
                field = field.with_label(label);
            }
            if let Some(raw) = default {
                field = field.with_default(field_type.coerce_input(&raw));
            }
            form.insert_field(field)?;
        }
        FieldCommands::Remove { id, .. } => {
            form.remove_field(&id)?;
        }
        FieldCommands::Move { id, direction, .. } => {
            let index = form.position_of(&id).ok_or_else(|| anyhow!("field not found: {id}"))?;
            let moved = match direction {
                Direction::Up => form.move_field_up(index),
                Direction::Down => form.move_field_down(index),
            };
            if !moved {
                println!("Field {id} is already at the {}", if index == 0 { "top" } else { "bottom" });
            }
        }
        FieldCommands::Options { id, options, .. } => {
            let field = form.field(&id).ok_or_else(|| anyhow!("field not found: {id}"))?;
            if !field.field_type.is_choice() {
                bail!("{} field {id} has no options", field.field_type);
            }
            for _ in 0..field.options.len() {
                form.remove_option(&id, 0)?;
            }
            for (i, raw) in options.iter().enumerate() {
                form.add_option(&id)?;
                form.set_option(&id, i, parse_option(raw))?;
            }
        }
        FieldCommands::Derive { id, parents, expr, clear, .. } => {
            let field = form.field(&id).ok_or_else(|| anyhow!("field not found: {id}"))?;
            let current: Vec<String> =
                field.derived.as_ref().map(|d| d.parents.iter().map(|p| p.to_string()).collect()).unwrap_or_default();
            let enabled = field.derived.is_some();

            if clear {
                if enabled {
                    form.toggle_derived(&id)?;
                }
                return Ok(());
            }
            if !enabled {
                form.toggle_derived(&id)?;
            }
            if !parents.is_empty() {
                for parent in current.iter().filter(|p| !parents.contains(p)) {
                    form.toggle_parent(&id, parent)?;
                }
                for parent in parents.iter().filter(|p| !current.contains(p)) {
                    form.toggle_parent(&id, parent)?;
                }
            }
            if let Some(expr) = expr {
                form.set_expression(&id, expr)?;
            }
        }
        FieldCommands::Rules { id, rules, .. } => {
            let mut field = form.field(&id).cloned().ok_or_else(|| anyhow!("field not found: {id}"))?;
            rules.apply(&mut field);
            form.update_field(&id, field)?;
        }
    }
    Ok(())
}

/// `Label=value`, or a bare text used as both
fn parse_option(raw: &str) -> FieldOption {
    match raw.split_once('=') {
        Some((label, value)) => FieldOption::new(label.trim(), value.trim()),
        None => FieldOption::plain(raw.trim()),
    }
}

fn describe(event: &FormEvent) -> String {
    match event {
        FormEvent::FieldAdded { field_id } => format!("{} field {field_id}", "Added".green()),
        FormEvent::FieldUpdated { field_id } => format!("{} field {field_id}", "Updated".green()),
        FormEvent::FieldRemoved { field_id } => format!("{} field {field_id}", "Removed".green()),
        FormEvent::FieldMoved { field_id, from, to } => {
            format!("{} field {field_id} from #{} to #{}", "Moved".green(), from + 1, to + 1)
        }
    }
}

/// Cycles and bad expressions are saved as-is but worth flagging
fn warn_on_derived_errors(form: &FormDescriptor) {
    let session = PreviewSession::new(form.clone());
    for (id, error) in session.derived_errors() {
        match error {
            EvaluationError::Cycle { .. } | EvaluationError::Parse { .. } | EvaluationError::MissingParent(_) => {
                eprintln!("{} {id}: {error}", "warning:".yellow().bold());
            }
            _ => {}
        }
    }
}
