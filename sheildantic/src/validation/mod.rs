//! Sanitize-then-validate framework for request input.
//!
//! A [`Model`] describes its fields with a [`Schema`]; [`InputValidator`]
//! runs [`InputData`] through HTML sanitization, coercion, `serde`
//! deserialization and `validator` constraints, producing a
//! [`ValidationResult`](crate::models::ValidationResult).

pub mod input;
pub mod pipeline;
pub mod rules;
pub mod schema;

pub use input::InputData;
pub use pipeline::InputValidator;
pub use schema::{parse_bool, FieldKind, FieldSpec, Model, Schema};
pub use validator::Validate;
