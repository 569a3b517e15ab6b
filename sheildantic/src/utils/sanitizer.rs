//! HTML sanitization backed by `ammonia`.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use ammonia::Builder;
use serde_json::Value;

use crate::{
    config::SanitizationConfig,
    error::{ConfigError, SanitizeError},
};

/// Tag key in `SanitizationConfig::attributes` whose attributes apply to every tag.
const GENERIC_ATTRIBUTES_KEY: &str = "*";

/// Cleans strings according to a [`SanitizationConfig`].
#[derive(Debug, Clone)]
pub struct Sanitizer {
    config: Arc<SanitizationConfig>,
}

impl Sanitizer {
    pub fn new(config: SanitizationConfig) -> Result<Self, ConfigError> {
        Self::shared(Arc::new(config))
    }

    pub fn shared(config: Arc<SanitizationConfig>) -> Result<Self, ConfigError> {
        config.check()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SanitizationConfig {
        &self.config
    }

    /// Translates the config into an ammonia builder. Unset options keep
    /// ammonia's defaults.
    pub(crate) fn builder(config: &SanitizationConfig) -> Builder<'_> {
        let mut builder = Builder::default();

        if let Some(tags) = &config.tags {
            builder.tags(as_strs(tags));
        }
        if let Some(attributes) = &config.attributes {
            let mut tag_attributes = HashMap::new();
            for (tag, attrs) in attributes {
                if tag == GENERIC_ATTRIBUTES_KEY {
                    builder.generic_attributes(as_strs(attrs));
                } else {
                    tag_attributes.insert(tag.as_str(), as_strs(attrs));
                }
            }
            builder.tag_attributes(tag_attributes);
        }
        if let Some(schemes) = &config.url_schemes {
            builder.url_schemes(as_strs(schemes));
        }
        if let Some(tags) = &config.clean_content_tags {
            builder.clean_content_tags(as_strs(tags));
        }
        if let Some(prefixes) = &config.generic_attribute_prefixes {
            builder.generic_attribute_prefixes(as_strs(prefixes));
        }
        builder
            .strip_comments(config.strip_comments)
            .link_rel(config.link_rel.as_deref());

        builder
    }

    /// Filters `value` through the configured allow-lists and enforces
    /// `max_field_size` on the result.
    pub fn clean(&self, field: &str, value: &str) -> Result<String, SanitizeError> {
        self.clean_with(&self.html_builder(), field, value)
    }

    /// Cleans every string inside `value`, keeping arrays and objects intact.
    pub fn clean_value(&self, field: &str, value: Value) -> Result<Value, SanitizeError> {
        self.clean_value_with(&self.html_builder(), field, value)
    }

    /// Builder for this sanitizer's config, for callers cleaning many values
    /// in one pass.
    pub(crate) fn html_builder(&self) -> Builder<'_> {
        Self::builder(&self.config)
    }

    pub(crate) fn clean_value_with(
        &self,
        builder: &Builder<'_>,
        field: &str,
        value: Value,
    ) -> Result<Value, SanitizeError> {
        match value {
            Value::String(s) => self.clean_with(builder, field, &s).map(Value::String),
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.clean_value_with(builder, field, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| Ok((k, self.clean_value_with(builder, field, v)?)))
                .collect::<Result<_, _>>()
                .map(Value::Object),
            other => Ok(other),
        }
    }

    fn clean_with(
        &self,
        builder: &Builder<'_>,
        field: &str,
        value: &str,
    ) -> Result<String, SanitizeError> {
        let cleaned = builder.clean(value).to_string();
        let limit = self.config.max_field_size;
        if limit > 0 {
            let length = cleaned.chars().count();
            if length > limit {
                tracing::warn!(field, length, limit, "Sanitized field exceeds maximum size");
                return Err(SanitizeError::FieldTooLarge {
                    field: field.to_string(),
                    limit,
                });
            }
        }
        Ok(cleaned)
    }

    /// Removes all markup from `value`, keeping only text. `script` and
    /// `style` elements are dropped together with their content.
    pub fn strip_markup(value: &str) -> String {
        strip_builder().clean(value).to_string()
    }

    /// Recursive form of [`Sanitizer::strip_markup`].
    pub fn strip_value(value: Value) -> Value {
        let builder = strip_builder();
        strip_value_with(&builder, value)
    }
}

fn strip_builder() -> Builder<'static> {
    let mut builder = Builder::default();
    builder.tags(HashSet::new());
    builder
}

fn strip_value_with(builder: &Builder<'_>, value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(builder.clean(&s).to_string()),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| strip_value_with(builder, item))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, strip_value_with(builder, v)))
                .collect(),
        ),
        other => other,
    }
}

fn as_strs(set: &BTreeSet<String>) -> HashSet<&str> {
    set.iter().map(String::as_str).collect()
}
