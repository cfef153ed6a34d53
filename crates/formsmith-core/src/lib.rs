//! Formsmith
//!
//! Form schema builder core: define fields with validation rules and
//! derived (computed) values, persist schemas by name, and run a live
//! preview that recomputes derived fields on every edit and validates on
//! submit.
//!
//! ## Architecture
//!
//! - **Domain Layer**: field/form aggregates, validation and derived-field services
//! - **Expression**: restricted expression language for derived fields
//! - **Application Layer**: form catalog, preview session
//! - **Ports Layer**: key-value storage interface
//! - **Infrastructure Layer**: in-memory and directory-backed stores

pub mod domain;
pub mod expression;
pub mod application;
pub mod ports;
pub mod infrastructure;
pub mod navigation;
pub mod error;

pub use domain::aggregates::{FieldDescriptor, FormDescriptor};
pub use domain::value_objects::{DerivedSpec, FieldId, FieldOption, FieldType, PasswordRule, ValidationRules};
pub use domain::events::FormEvent;
pub use domain::services::{compute_derived, validate, validate_field, DerivedPlan, RuleViolation};
pub use expression::EvaluationError;
pub use application::{FormCatalog, FormSubmission, PreviewSession, SavedFormSummary, StoredForm};
pub use ports::outbound::{KeyValueStore, StorageError};
pub use infrastructure::{FileKeyValueStore, InMemoryKeyValueStore};
pub use navigation::Route;
pub use error::{FormsError, Result};
