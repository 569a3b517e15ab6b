use std::{
    collections::{BTreeMap, BTreeSet},
    env,
    net::SocketAddr,
};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, utils::sanitizer::Sanitizer, validation::schema::parse_bool};

pub const DEFAULT_MAX_FIELD_SIZE: usize = 1024;
pub const DEFAULT_LINK_REL: &str = "noopener noreferrer";

/// HTML sanitization settings applied to every string field.
///
/// `None` for a set means "use the sanitizer's built-in default". The
/// `"*"` key of `attributes` lists attributes allowed on every tag.
/// `max_field_size` bounds the character length of each sanitized string;
/// `0` turns the check off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizationConfig {
    pub tags: Option<BTreeSet<String>>,
    pub attributes: Option<BTreeMap<String, BTreeSet<String>>>,
    pub url_schemes: Option<BTreeSet<String>>,
    pub strip_comments: bool,
    pub link_rel: Option<String>,
    pub clean_content_tags: Option<BTreeSet<String>>,
    pub generic_attribute_prefixes: Option<BTreeSet<String>>,
    pub max_field_size: usize,
}

impl Default for SanitizationConfig {
    fn default() -> Self {
        Self {
            tags: None,
            attributes: None,
            url_schemes: None,
            strip_comments: true,
            link_rel: Some(DEFAULT_LINK_REL.to_string()),
            clean_content_tags: None,
            generic_attribute_prefixes: None,
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
        }
    }
}

impl SanitizationConfig {
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_attributes<I, S>(mut self, tag: &str, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(tag.to_string(), attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_url_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.url_schemes = Some(schemes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_clean_content_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clean_content_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_generic_attribute_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generic_attribute_prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_strip_comments(mut self, strip: bool) -> Self {
        self.strip_comments = strip;
        self
    }

    pub fn with_link_rel(mut self, link_rel: Option<&str>) -> Self {
        self.link_rel = link_rel.map(str::to_string);
        self
    }

    pub fn with_max_field_size(mut self, max_field_size: usize) -> Self {
        self.max_field_size = max_field_size;
        self
    }

    /// Rejects combinations the HTML sanitizer would refuse at clean time.
    pub fn check(&self) -> Result<(), ConfigError> {
        let builder = Sanitizer::builder(self);
        let allowed = builder.clone_tags();
        let mut clean_content: Vec<&str> = builder.clone_clean_content_tags().into_iter().collect();
        clean_content.sort_unstable();

        if let Some(tag) = clean_content.iter().find(|tag| allowed.contains(*tag)) {
            return Err(ConfigError::TagConflict(tag.to_string()));
        }

        // Generic ("*") attributes do not conflict; per-tag entries do.
        if let Some(attributes) = &self.attributes {
            if let Some(tag) = clean_content
                .iter()
                .find(|tag| **tag != "*" && attributes.contains_key(**tag))
            {
                return Err(ConfigError::AttributeConflict(tag.to_string()));
            }
        }

        if self.link_rel.is_some() {
            let allows_rel = self.attributes.as_ref().is_some_and(|attributes| {
                ["a", "*"].iter().any(|tag| {
                    attributes
                        .get(*tag)
                        .is_some_and(|attrs| attrs.contains("rel"))
                })
            });
            if allows_rel {
                return Err(ConfigError::RelConflict);
            }
        }

        Ok(())
    }

    /// Loads overrides from `SHEILDANTIC_*` environment variables (and `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(tags) = lookup("SHEILDANTIC_TAGS") {
            config.tags = Some(split_list(&tags));
        }
        if let Some(schemes) = lookup("SHEILDANTIC_URL_SCHEMES") {
            config.url_schemes = Some(split_list(&schemes));
        }
        if let Some(tags) = lookup("SHEILDANTIC_CLEAN_CONTENT_TAGS") {
            config.clean_content_tags = Some(split_list(&tags));
        }
        if let Some(value) = lookup("SHEILDANTIC_STRIP_COMMENTS") {
            config.strip_comments =
                parse_bool(value.trim()).ok_or_else(|| invalid("SHEILDANTIC_STRIP_COMMENTS", &value))?;
        }
        if let Some(value) = lookup("SHEILDANTIC_LINK_REL") {
            let value = value.trim();
            config.link_rel = (!value.is_empty()).then(|| value.to_string());
        }
        if let Some(value) = lookup("SHEILDANTIC_MAX_FIELD_SIZE") {
            config.max_field_size = value
                .trim()
                .parse()
                .map_err(|_| invalid("SHEILDANTIC_MAX_FIELD_SIZE", &value))?;
        }

        config.check()?;
        Ok(config)
    }
}

fn split_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidVar {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Settings for the demo server binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub cors_allow_origins: Vec<String>,
    pub sanitization: SanitizationConfig,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let bind_addr_raw =
            env::var("SHEILDANTIC_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr: SocketAddr = bind_addr_raw
            .parse()
            .map_err(|_| anyhow!("Invalid SHEILDANTIC_BIND_ADDR value: {}", bind_addr_raw))?;

        let cors_allow_origins = env::var("SHEILDANTIC_CORS_ALLOW_ORIGINS")
            .map(|raw| split_list(&raw).into_iter().collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let sanitization = SanitizationConfig::from_lookup(|key| env::var(key).ok())?;

        Ok(Config {
            bind_addr,
            cors_allow_origins,
            sanitization,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn default_matches_documented_values() {
        let config = SanitizationConfig::default();
        assert!(config.strip_comments);
        assert_eq!(config.link_rel.as_deref(), Some("noopener noreferrer"));
        assert_eq!(config.max_field_size, 1024);
        assert!(config.tags.is_none());
        assert!(config.check().is_ok());
    }

    #[test]
    fn check_rejects_tag_in_both_lists() {
        let config = SanitizationConfig::default()
            .with_tags(["b", "script"])
            .with_clean_content_tags(["script"]);
        assert_eq!(
            config.check(),
            Err(ConfigError::TagConflict("script".to_string()))
        );
    }

    #[test]
    fn check_rejects_attributes_on_clean_content_tag() {
        // `style` is a clean-content tag by default.
        let config = SanitizationConfig::default().with_attributes("style", ["media"]);
        assert_eq!(
            config.check(),
            Err(ConfigError::AttributeConflict("style".to_string()))
        );

        let config = SanitizationConfig::default()
            .with_attributes("code", ["class"])
            .with_clean_content_tags(["code"])
            .with_tags(["b"]);
        assert_eq!(
            config.check(),
            Err(ConfigError::AttributeConflict("code".to_string()))
        );
    }

    #[test]
    fn check_allows_generic_attributes_with_clean_content_tags() {
        let config = SanitizationConfig::default()
            .with_attributes("*", ["title"])
            .with_attributes("a", ["href"]);
        assert!(config.check().is_ok());
    }

    #[test]
    fn check_rejects_default_tag_marked_for_removal() {
        let config = SanitizationConfig::default().with_clean_content_tags(["b"]);
        assert_eq!(config.check(), Err(ConfigError::TagConflict("b".to_string())));
    }

    #[test]
    fn check_rejects_rel_attribute_with_link_rel() {
        let config = SanitizationConfig::default().with_attributes("a", ["href", "rel"]);
        assert_eq!(config.check(), Err(ConfigError::RelConflict));

        let config = config.with_link_rel(None);
        assert!(config.check().is_ok());
    }

    #[test]
    fn from_lookup_reads_overrides() {
        let config = SanitizationConfig::from_lookup(lookup(&[
            ("SHEILDANTIC_TAGS", "b, i ,em"),
            ("SHEILDANTIC_URL_SCHEMES", "https"),
            ("SHEILDANTIC_STRIP_COMMENTS", "no"),
            ("SHEILDANTIC_LINK_REL", ""),
            ("SHEILDANTIC_MAX_FIELD_SIZE", "64"),
        ]))
        .expect("config");

        let tags: Vec<&str> = config
            .tags
            .as_ref()
            .expect("tags")
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(tags, vec!["b", "em", "i"]);
        assert!(!config.strip_comments);
        assert!(config.link_rel.is_none());
        assert_eq!(config.max_field_size, 64);
    }

    #[test]
    fn from_lookup_rejects_bad_numbers() {
        let err = SanitizationConfig::from_lookup(lookup(&[(
            "SHEILDANTIC_MAX_FIELD_SIZE",
            "lots",
        )]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidVar {
                key: "SHEILDANTIC_MAX_FIELD_SIZE".to_string(),
                value: "lots".to_string(),
            }
        );
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let config: SanitizationConfig =
            serde_json::from_str(r#"{"tags": ["p"], "max_field_size": 10}"#).expect("json");
        assert_eq!(config.max_field_size, 10);
        assert!(config.strip_comments);
        assert_eq!(config.link_rel.as_deref(), Some(DEFAULT_LINK_REL));
    }
}
