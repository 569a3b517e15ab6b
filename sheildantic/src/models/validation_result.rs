use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ValidationErrorDetail;

/// Outcome of running input through the sanitize-then-validate pipeline.
///
/// `sanitized_data` holds the HTML-filtered input (allowed markup kept) and is
/// filled in even when validation fails, so callers can echo it back. `model`
/// is only set when every check passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult<T> {
    pub is_valid: bool,
    pub model: Option<T>,
    #[serde(default)]
    pub errors: Vec<ValidationErrorDetail>,
    #[serde(default)]
    pub sanitized_data: Map<String, Value>,
}

impl<T> ValidationResult<T> {
    /// An empty result that has not passed validation yet.
    pub fn invalid() -> Self {
        Self {
            is_valid: false,
            model: None,
            errors: Vec::new(),
            sanitized_data: Map::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the first error reported for `field`.
    pub fn error_for(&self, field: &str) -> Option<&ValidationErrorDetail> {
        self.errors.iter().find(|e| e.field == field)
    }

    pub fn into_model(self) -> Result<T, Vec<ValidationErrorDetail>> {
        match self.model {
            Some(model) if self.is_valid => Ok(model),
            _ => Err(self.errors),
        }
    }

    pub(crate) fn push_error(&mut self, detail: ValidationErrorDetail) {
        self.errors.push(detail);
    }

    pub(crate) fn accept(&mut self, model: T) {
        self.model = Some(model);
        self.is_valid = true;
    }
}

impl<T> Default for ValidationResult<T> {
    fn default() -> Self {
        Self::invalid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_invalid_and_empty() {
        let result: ValidationResult<u32> = ValidationResult::invalid();
        assert!(!result.is_valid);
        assert!(result.model.is_none());
        assert!(!result.has_errors());
        assert!(result.sanitized_data.is_empty());
    }

    #[test]
    fn accept_marks_result_valid() {
        let mut result = ValidationResult::invalid();
        result.accept(7u32);
        assert!(result.is_valid);
        assert_eq!(result.into_model(), Ok(7));
    }

    #[test]
    fn into_model_returns_errors_when_invalid() {
        let mut result: ValidationResult<u32> = ValidationResult::invalid();
        result.push_error(ValidationErrorDetail::new("age", "Field required"));
        let errors = result.into_model().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "age");
    }

    #[test]
    fn error_for_finds_first_matching_field() {
        let mut result: ValidationResult<u32> = ValidationResult::invalid();
        result.push_error(ValidationErrorDetail::new("tags", "first"));
        result.push_error(ValidationErrorDetail::new("tags", "second"));
        assert_eq!(result.error_for("tags").map(|e| e.message.as_str()), Some("first"));
        assert!(result.error_for("name").is_none());
    }
}
