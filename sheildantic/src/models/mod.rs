//! Data models returned by the validation pipeline and used by the demo API.

pub mod error_detail;
pub mod profile;
pub mod validation_result;

pub use error_detail::{ValidationErrorDetail, GENERAL_FIELD};
pub use validation_result::ValidationResult;
