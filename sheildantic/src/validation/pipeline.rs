//! The sanitize-then-validate pipeline.

use std::{collections::BTreeSet, marker::PhantomData, sync::Arc};

use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::{
    config::SanitizationConfig,
    error::{ConfigError, SanitizeError},
    models::{ValidationErrorDetail, ValidationResult},
    utils::sanitizer::Sanitizer,
};

use super::{
    input::InputData,
    schema::{coerce, is_integer_like, parse_bool, FieldKind, Model, Schema},
};

/// Key `validator` uses for struct-level (schema) errors.
const SCHEMA_ERRORS_KEY: &str = "__all__";

/// Sanitizes raw input and validates it into `T`.
///
/// Two passes run over every string: the first keeps markup the config
/// allows and is what callers get back as `sanitized_data`; the second strips
/// all markup and feeds the typed model.
pub struct InputValidator<T> {
    schema: Schema,
    list_fields: BTreeSet<&'static str>,
    sanitizer: Sanitizer,
    _model: PhantomData<fn() -> T>,
}

impl<T: Model> InputValidator<T> {
    pub fn new(config: SanitizationConfig) -> Result<Self, ConfigError> {
        Self::with_shared_config(Arc::new(config))
    }

    pub fn with_shared_config(config: Arc<SanitizationConfig>) -> Result<Self, ConfigError> {
        let schema = T::schema();
        let list_fields = schema.list_fields();
        Ok(Self {
            schema,
            list_fields,
            sanitizer: Sanitizer::shared(config)?,
            _model: PhantomData,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_list_field(&self, name: &str) -> bool {
        self.list_fields.contains(name)
    }

    /// First pass: HTML-filters every schema field present in `raw`.
    ///
    /// Keys the schema does not know are dropped. List fields always appear
    /// (empty when absent). Boolean fields are normalized from text instead
    /// of being sanitized; unrecognized values are kept as strings so the
    /// pre-checks can report them.
    pub fn sanitize_input(&self, raw: &InputData) -> Result<Map<String, Value>, SanitizeError> {
        let mut sanitized = Map::new();
        let builder = self.sanitizer.html_builder();

        for spec in self.schema.fields() {
            let name = spec.name;

            if self.is_list_field(name) {
                let items = multi_values(raw, name)
                    .into_iter()
                    .map(|item| self.sanitizer.clean_value_with(&builder, name, item))
                    .collect::<Result<Vec<_>, _>>()?;
                sanitized.insert(name.to_string(), Value::Array(items));
                continue;
            }

            let Some(value) = raw.get(name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            let value = match spec.kind {
                FieldKind::Boolean => normalize_bool(value),
                _ => self.sanitizer.clean_value_with(&builder, name, value.clone())?,
            };
            sanitized.insert(name.to_string(), value);
        }

        Ok(sanitized)
    }

    /// Runs the full pipeline. Stops at the first stage that reports errors;
    /// an oversized value is reported on its own field and leaves
    /// `sanitized_data` empty.
    pub async fn validate(&self, raw: &InputData) -> ValidationResult<T> {
        tracing::debug!(
            fields = self.schema.len(),
            keys = raw.len(),
            "Validating input"
        );
        let result = self.run(raw);
        tracing::debug!(
            is_valid = result.is_valid,
            errors = result.errors.len(),
            "Input validation finished"
        );
        result
    }

    fn run(&self, raw: &InputData) -> ValidationResult<T> {
        let mut result = ValidationResult::invalid();

        let sanitized = match self.sanitize_input(raw) {
            Ok(sanitized) => sanitized,
            Err(err) => {
                result.push_error(ValidationErrorDetail::new(err.field(), err.to_string()));
                return result;
            }
        };
        result.sanitized_data = sanitized.clone();

        self.precheck(raw, &sanitized, &mut result);
        if result.has_errors() {
            return result;
        }

        let model_data = match Sanitizer::strip_value(Value::Object(sanitized.clone())) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for spec in self.schema.fields() {
            if spec.required && !model_data.contains_key(spec.name) {
                result.push_error(ValidationErrorDetail::new(spec.name, "Field required"));
            }
        }
        if result.has_errors() {
            return result;
        }

        let mut coerced = Map::new();
        for (name, value) in model_data {
            let Some(spec) = self.schema.get(&name) else {
                continue;
            };
            match coerce(&spec.kind, value) {
                Ok(value) => {
                    coerced.insert(name, value);
                }
                Err(messages) => {
                    for message in messages {
                        result.push_error(field_error(&name, message, raw, &sanitized));
                    }
                }
            }
        }
        if result.has_errors() {
            return result;
        }

        let model: T = match serde_json::from_value(Value::Object(coerced)) {
            Ok(model) => model,
            Err(err) => {
                result.push_error(ValidationErrorDetail::general(err.to_string()));
                return result;
            }
        };

        if let Err(errors) = model.validate() {
            self.push_constraint_errors(&errors, raw, &sanitized, &mut result);
            return result;
        }

        result.accept(model);
        result
    }

    /// Checks that need the sanitized (pre-coercion) shape: booleans that
    /// did not match the vocabulary and integer lists with unparsable items.
    fn precheck(
        &self,
        raw: &InputData,
        sanitized: &Map<String, Value>,
        result: &mut ValidationResult<T>,
    ) {
        for spec in self.schema.fields() {
            let Some(value) = sanitized.get(spec.name) else {
                continue;
            };

            match (&spec.kind, value) {
                (FieldKind::Boolean, Value::String(s)) if parse_bool(s).is_none() => {
                    result.push_error(field_error(
                        spec.name,
                        format!("Value '{}' could not be parsed to a boolean", s),
                        raw,
                        sanitized,
                    ));
                }
                (FieldKind::List(_), Value::Array(items))
                    if spec.kind.item_kind() == Some(&FieldKind::Integer) =>
                {
                    for (index, item) in items.iter().enumerate() {
                        if !is_integer_like(item) {
                            result.push_error(field_error(
                                spec.name,
                                format!(
                                    "Value '{}' at index {} could not be parsed to an integer",
                                    display_value(item),
                                    index
                                ),
                                raw,
                                sanitized,
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn push_constraint_errors(
        &self,
        errors: &ValidationErrors,
        raw: &InputData,
        sanitized: &Map<String, Value>,
        result: &mut ValidationResult<T>,
    ) {
        let mut fields: Vec<(&str, &ValidationErrorsKind)> = errors
            .errors()
            .iter()
            .map(|(field, kind)| (field.as_ref(), kind))
            .collect();
        fields.sort_by_key(|(field, _)| {
            (self.schema.position(field).unwrap_or(usize::MAX), *field)
        });

        for (field, kind) in fields {
            let mut messages = Vec::new();
            collect_messages(kind, &mut messages);

            for message in messages {
                let detail = if field == SCHEMA_ERRORS_KEY {
                    ValidationErrorDetail::general(message)
                } else {
                    field_error(field, message, raw, sanitized)
                };
                result.push_error(detail);
            }
        }
    }
}

fn field_error(
    field: &str,
    message: impl Into<String>,
    raw: &InputData,
    sanitized: &Map<String, Value>,
) -> ValidationErrorDetail {
    ValidationErrorDetail::new(field, message)
        .with_input(raw.raw_value(field))
        .with_sanitized(sanitized.get(field).cloned())
}

/// All values for a list field; a JSON array value is flattened into items.
fn multi_values(raw: &InputData, name: &str) -> Vec<Value> {
    raw.get_all(name)
        .iter()
        .flat_map(|value| match value {
            Value::Array(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        })
        .collect()
}

fn normalize_bool(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(*b),
        Value::String(s) => match parse_bool(s) {
            Some(b) => Value::Bool(b),
            // Never echo markup back through error messages.
            None => Value::String(Sanitizer::strip_markup(s)),
        },
        Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Bool(i != 0),
            None if n.is_u64() => Value::Bool(true),
            None => Value::String(n.to_string()),
        },
        other => Value::String(other.to_string()),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn collect_messages(kind: &ValidationErrorsKind, out: &mut Vec<String>) {
    match kind {
        ValidationErrorsKind::Field(errors) => {
            out.extend(errors.iter().map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => e.code.to_string(),
            }));
        }
        ValidationErrorsKind::Struct(nested) => {
            for kind in nested.errors().values() {
                collect_messages(kind, out);
            }
        }
        ValidationErrorsKind::List(items) => {
            for nested in items.values() {
                for kind in nested.errors().values() {
                    collect_messages(kind, out);
                }
            }
        }
    }
}
