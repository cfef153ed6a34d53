//! Domain services

pub mod derived;
pub mod validation;

pub use derived::{compute_derived, compute_derived_at, DerivedPlan};
pub use validation::{is_blank, validate, validate_all, validate_field, RuleViolation};
