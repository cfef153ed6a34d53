//! Error types for formsmith

use thiserror::Error;

use crate::ports::outbound::StorageError;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum FormsError {
    /// No stored form under this name, or the stored record was unreadable
    #[error("form not found: {0}")]
    FormNotFound(String),

    /// Field id is not part of the form
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// Field id already used in the form
    #[error("duplicate field id: {0}")]
    DuplicateField(String),

    /// Derived fields only take evaluator-produced values
    #[error("field is derived and read-only: {0}")]
    ReadOnlyField(String),

    /// A derived field listed itself as a parent
    #[error("field cannot depend on itself: {0}")]
    SelfDependency(String),

    /// Structurally invalid schema or edit request
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Submission blocked by failing fields
    #[error("validation failed for {0} field(s)")]
    ValidationFailed(usize),

    /// Storage backend failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// JSON encoding failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for formsmith
pub type Result<T> = std::result::Result<T, FormsError>;
