//! Application layer
//!
//! Use cases over the domain: the saved-form catalog and the live preview.

pub mod catalog;
pub mod preview;

pub use catalog::{FormCatalog, SavedFormSummary, StoredForm};
pub use preview::{FormSubmission, PreviewSession};
