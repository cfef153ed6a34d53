//! CLI Commands

pub mod config;
pub mod fields;
pub mod forms;
pub mod preview;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

use formsmith_core::{FileKeyValueStore, FormCatalog, Route};

use crate::output::OutputFormat;

/// Catalog over the directory store at `dir`
pub async fn open_catalog(dir: &Path) -> anyhow::Result<FormCatalog> {
    let store = FileKeyValueStore::open(dir)
        .await
        .with_context(|| format!("opening form store at {}", dir.display()))?;
    tracing::debug!(dir = %dir.display(), "form store opened");
    Ok(FormCatalog::new(Arc::new(store)))
}

/// Dispatch a view path to the matching command
pub async fn open(path: &str, catalog: &FormCatalog, format: OutputFormat) -> anyhow::Result<()> {
    match Route::parse(path) {
        Some(Route::Create) => {
            println!("Create a form with `formsmith forms create <name>`, then add fields with `formsmith fields add`.");
            Ok(())
        }
        Some(Route::MyForms) => forms::list(catalog, format).await,
        Some(Route::Preview(name)) => preview::handle(catalog, &name, &[], false, format).await,
        None => anyhow::bail!("unknown view path: {path}"),
    }
}
