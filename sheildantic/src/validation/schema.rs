//! Field-level description of a model and lax coercion of loosely typed input.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use validator::Validate;

pub const INVALID_STRING: &str = "Input should be a valid string";
pub const INVALID_INTEGER: &str = "Input should be a valid integer";
pub const UNPARSABLE_INTEGER: &str =
    "Input should be a valid integer, unable to parse string as an integer";
pub const FRACTIONAL_INTEGER: &str =
    "Input should be a valid integer, got a number with a fractional part";
pub const INVALID_NUMBER: &str = "Input should be a valid number";
pub const UNPARSABLE_NUMBER: &str =
    "Input should be a valid number, unable to parse string as a number";
pub const NON_FINITE_NUMBER: &str = "Input should be a finite number";
pub const INVALID_BOOLEAN: &str = "Input should be a valid boolean";
pub const INVALID_LIST: &str = "Input should be a valid list";

/// Shape of a single model field, as far as coercion is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    List(Box<FieldKind>),
    /// Passed through untouched (nested objects, free-form JSON).
    Any,
}

impl FieldKind {
    pub fn list_of(inner: FieldKind) -> Self {
        FieldKind::List(Box::new(inner))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FieldKind::List(_))
    }

    pub fn item_kind(&self) -> Option<&FieldKind> {
        match self {
            FieldKind::List(inner) => Some(inner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Ordered list of the fields a model accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.retain(|f| f.name != spec.name);
        self.fields.push(spec);
        self
    }

    pub fn required(self, name: &'static str, kind: FieldKind) -> Self {
        self.field(FieldSpec::required(name, kind))
    }

    pub fn optional(self, name: &'static str, kind: FieldKind) -> Self {
        self.field(FieldSpec::optional(name, kind))
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn list_fields(&self) -> BTreeSet<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.kind.is_list())
            .map(|f| f.name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<FieldSpec> for Schema {
    fn from_iter<I: IntoIterator<Item = FieldSpec>>(iter: I) -> Self {
        iter.into_iter().fold(Schema::new(), Schema::field)
    }
}

/// A typed model the pipeline can build from sanitized input.
///
/// The schema drives sanitization and coercion; `serde` builds the value and
/// `validator` checks its constraints.
pub trait Model: DeserializeOwned + Validate {
    fn schema() -> Schema;
}

/// Case-insensitive boolean vocabulary accepted from text input.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Converts `value` into the JSON shape `kind` expects, the way a lax
/// validator would: numeric strings become numbers, `0`/`1` become booleans,
/// a lone scalar becomes a one-element list. Returns every problem found;
/// list items contribute one message each.
pub fn coerce(kind: &FieldKind, value: Value) -> Result<Value, Vec<String>> {
    match kind {
        FieldKind::Any => Ok(value),
        FieldKind::List(inner) => coerce_list(inner, value),
        scalar => coerce_scalar(scalar, value).map_err(|msg| vec![msg.to_string()]),
    }
}

fn coerce_list(inner: &FieldKind, value: Value) -> Result<Value, Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null | Value::Object(_) => return Err(vec![INVALID_LIST.to_string()]),
        scalar => vec![scalar],
    };

    let mut coerced = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for item in items {
        match coerce(inner, item) {
            Ok(v) => coerced.push(v),
            Err(mut messages) => errors.append(&mut messages),
        }
    }

    if errors.is_empty() {
        Ok(Value::Array(coerced))
    } else {
        Err(errors)
    }
}

fn coerce_scalar(kind: &FieldKind, value: Value) -> Result<Value, &'static str> {
    match kind {
        FieldKind::String => match value {
            Value::String(_) => Ok(value),
            _ => Err(INVALID_STRING),
        },
        FieldKind::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
            Value::Number(n) => integral(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| UNPARSABLE_INTEGER),
            Value::Bool(b) => Ok(Value::from(i64::from(b))),
            _ => Err(INVALID_INTEGER),
        },
        FieldKind::Float => match value {
            Value::Number(_) => Ok(value),
            Value::String(s) => {
                let parsed = s.trim().parse::<f64>().map_err(|_| UNPARSABLE_NUMBER)?;
                Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or(NON_FINITE_NUMBER)
            }
            Value::Bool(b) => Ok(Value::from(if b { 1.0 } else { 0.0 })),
            _ => Err(INVALID_NUMBER),
        },
        FieldKind::Boolean => match value {
            Value::Bool(_) => Ok(value),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(INVALID_BOOLEAN),
            },
            Value::String(s) => parse_bool(&s).map(Value::Bool).ok_or(INVALID_BOOLEAN),
            _ => Err(INVALID_BOOLEAN),
        },
        FieldKind::List(_) | FieldKind::Any => Ok(value),
    }
}

fn integral(f: f64) -> Result<Value, &'static str> {
    if !f.is_finite() {
        return Err(INVALID_INTEGER);
    }
    if f.fract() != 0.0 {
        return Err(FRACTIONAL_INTEGER);
    }
    if f < i64::MIN as f64 || f > i64::MAX as f64 {
        return Err(INVALID_INTEGER);
    }
    Ok(Value::from(f as i64))
}

/// Whether `value` would survive an integer conversion.
pub(crate) fn is_integer_like(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(f64::is_finite),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        Value::Bool(_) => true,
        _ => false,
    }
}
