use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name used for errors that do not belong to a single field.
pub const GENERAL_FIELD: &str = "general";

/// A single problem found while sanitizing or validating one input field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
    /// The raw value the caller sent for the field, if any.
    pub input_value: Option<Value>,
    /// The value after HTML sanitization, if sanitization got that far.
    #[serde(default)]
    pub sanitized_value: Option<Value>,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            input_value: None,
            sanitized_value: None,
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self::new(GENERAL_FIELD, message)
    }

    pub fn with_input(mut self, value: Option<Value>) -> Self {
        self.input_value = value;
        self
    }

    pub fn with_sanitized(mut self, value: Option<Value>) -> Self {
        self.sanitized_value = value;
        self
    }

    pub fn is_general(&self) -> bool {
        self.field == GENERAL_FIELD
    }
}
