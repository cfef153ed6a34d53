//! Form domain model
//!
//! - **Value Objects**: FieldId, FieldType, FieldOption, ValidationRules, DerivedSpec
//! - **Aggregates**: FormDescriptor (ordered fields), FieldDescriptor
//! - **Events**: FormEvent
//! - **Services**: validation evaluator, derived-field evaluator

pub mod value_objects;
pub mod aggregates;
pub mod events;
pub mod services;

pub use value_objects::*;
pub use aggregates::*;
pub use events::*;
