//! Sanitize and validate untrusted request input into typed models.
//!
//! Every string is filtered through `ammonia` with a configurable allow-list,
//! coerced into the shape a [`Model`](validation::Model) declares, then
//! deserialized with `serde` and checked with `validator`.
//!
//! Errors that belong to no single field (struct-level rules, model
//! construction failures) are reported on the `"general"` field. A value that
//! exceeds `max_field_size` after sanitization is reported on the offending
//! field instead, with no `input_value` and an empty `sanitized_data`.
//! Clients that expect every size error on `"general"` need to match on the
//! message (`Field exceeds maximum size N`) rather than the field.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod utils;
pub mod validation;

pub use config::SanitizationConfig;
pub use extract::{request_data, validation_layer, Sanitized, Validated};
pub use models::{ValidationErrorDetail, ValidationResult};
pub use validation::{FieldKind, InputData, InputValidator, Model, Schema};
