//! Aggregates

pub mod field;
pub mod form;

pub use field::FieldDescriptor;
pub use form::FormDescriptor;
