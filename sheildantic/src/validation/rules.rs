//! Common validation rules for sanitized text fields.

use std::borrow::Cow;

use url::Url;
use validator::ValidationError;

/// Validates identifier format (handles, slugs).
///
/// Requirements:
/// - Only alphanumeric characters and underscores
/// - 1-50 characters in length
pub fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if length == 0 || length > 50 {
        return Err(ValidationError::new("identifier_invalid_length")
            .with_message(Cow::Borrowed("Identifier must be 1-50 characters")));
    }

    if !value.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ValidationError::new("identifier_invalid_characters").with_message(
            Cow::Borrowed("Identifier may only contain letters, digits and underscores"),
        ));
    }

    Ok(())
}

/// Rejects text that still carries angle brackets after sanitization
/// (escaped markup such as `&lt;b&gt;` included).
pub fn validate_no_markup(value: &str) -> Result<(), ValidationError> {
    let lowered = value.to_ascii_lowercase();
    if value.contains(['<', '>']) || lowered.contains("&lt;") || lowered.contains("&gt;") {
        return Err(ValidationError::new("contains_markup")
            .with_message(Cow::Borrowed("Markup is not allowed")));
    }
    Ok(())
}

/// Validates an absolute `http` or `https` URL.
pub fn validate_http_url(value: &str) -> Result<(), ValidationError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(()),
        _ => Err(ValidationError::new("url_invalid")
            .with_message(Cow::Borrowed("Must be an http or https URL"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.is_err());
    }

    #[test]
    fn identifier_rejects_special_chars() {
        let err = validate_identifier("user@name").unwrap_err();
        assert_eq!(err.code, "identifier_invalid_characters");
    }

    #[test]
    fn identifier_rejects_too_long() {
        let err = validate_identifier(&"a".repeat(51)).unwrap_err();
        assert_eq!(err.code, "identifier_invalid_length");
    }

    #[test]
    fn identifier_accepts_valid() {
        let result = validate_identifier("valid_user123");
        assert!(result.is_ok());
    }

    #[test]
    fn no_markup_rejects_escaped_tags() {
        assert!(validate_no_markup("&lt;b&gt;hi").is_err());
        assert!(validate_no_markup("a < b").is_err());
    }

    #[test]
    fn no_markup_accepts_plain_text() {
        assert!(validate_no_markup("Tom &amp; Jerry").is_ok());
    }

    #[test]
    fn http_url_rejects_other_schemes() {
        assert!(validate_http_url("javascript:alert(1)").is_err());
        assert!(validate_http_url("ftp://example.com").is_err());
        assert!(validate_http_url("not a url").is_err());
    }

    #[test]
    fn http_url_accepts_web_urls() {
        assert!(validate_http_url("https://example.com/path?q=1").is_ok());
        assert!(validate_http_url("http://localhost:8080").is_ok());
    }
}
