//! Forms commands

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Deserialize;
use std::path::Path;
use tabled::Tabled;

use formsmith_core::{FieldDescriptor, FormCatalog, FormDescriptor, Route, StoredForm};

use crate::output::{FieldRow, OutputFormat};
use crate::FormCommands;

#[derive(Tabled)]
struct FormRow {
    name: String,
    created: String,
    preview: String,
}

pub async fn handle(action: FormCommands, catalog: &FormCatalog, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        FormCommands::List => list(catalog, format).await?,
        FormCommands::Show { name } => {
            let form = catalog.require(&name).await?;
            format.print(&StoredForm::from(&form), || field_rows(&form))?;
        }
        FormCommands::Create { name } => {
            if catalog.load(&name).await?.is_some() {
                bail!("form '{name}' already exists");
            }
            catalog.save(&FormDescriptor::create(name.as_str())).await?;
            println!("{} form '{}'", "Created".green(), name);
        }
        FormCommands::Delete { name } => {
            catalog.delete(&name).await?;
            println!("{} form '{}'", "Deleted".green(), name);
        }
        FormCommands::Import { name, file } => {
            let form = read_form(&name, &file)?;
            catalog.save(&form).await?;
            println!("{} '{}' with {} field(s)", "Imported".green(), name, form.fields().len());
        }
        FormCommands::Export { name } => {
            let form = catalog.require(&name).await?;
            println!("{}", serde_json::to_string_pretty(&StoredForm::from(&form))?);
        }
    }
    Ok(())
}

pub async fn list(catalog: &FormCatalog, format: OutputFormat) -> anyhow::Result<()> {
    let forms = catalog.list().await?;
    format.print(&forms, || {
        forms
            .iter()
            .map(|f| FormRow {
                name: f.name.clone(),
                created: f.created_at.format("%Y-%m-%d %H:%M").to_string(),
                preview: Route::Preview(f.name.clone()).to_path(),
            })
            .collect()
    })
}

pub fn field_rows(form: &FormDescriptor) -> Vec<FieldRow> {
    form.fields().iter().enumerate().map(|(i, f)| FieldRow::new(i + 1, f)).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Record(StoredForm),
    Fields(Vec<FieldDescriptor>),
}

/// A stored record, or a bare field array stamped now
fn read_form(name: &str, path: &Path) -> anyhow::Result<FormDescriptor> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let parsed: ImportFile =
        serde_json::from_str(&raw).with_context(|| format!("{} is not a form record", path.display()))?;
    let form = match parsed {
        ImportFile::Record(record) => FormDescriptor::restore(name, record.created_at, record.fields),
        ImportFile::Fields(fields) => FormDescriptor::restore(name, chrono::Utc::now(), fields),
    };
    form.check_integrity()?;
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_record_and_bare_fields() {
        let mut record = tempfile::NamedTempFile::new().unwrap();
        write!(
            record,
            r#"{{"createdAt":"2024-04-01T10:00:00Z","fields":[{{"id":"a","type":"text","label":"A"}}]}}"#
        )
        .unwrap();
        let form = read_form("A", record.path()).unwrap();
        assert_eq!(form.name(), "A");
        assert_eq!(form.fields().len(), 1);

        let mut bare = tempfile::NamedTempFile::new().unwrap();
        write!(bare, r#"[{{"id":"a","type":"number","label":"A"}},{{"id":"b","type":"date","label":"B"}}]"#).unwrap();
        assert_eq!(read_form("B", bare.path()).unwrap().fields().len(), 2);
    }

    #[test]
    fn test_read_rejects_duplicates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id":"a","type":"text","label":"A"}},{{"id":"a","type":"text","label":"B"}}]"#).unwrap();
        assert!(read_form("dup", file.path()).is_err());
    }
}
