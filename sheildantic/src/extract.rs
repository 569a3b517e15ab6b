//! axum integration: turn request bodies into [`InputData`] and run the
//! validation pipeline as an extractor.
//!
//! ```ignore
//! async fn create(Validated(result): Validated<Profile>) -> impl IntoResponse {
//!     if !result.is_valid { /* inspect result.errors */ }
//! }
//!
//! let app = Router::new()
//!     .route("/profiles", post(create))
//!     .layer(validation_layer(SanitizationConfig::default()));
//! ```

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, HeaderMap},
    Extension,
};
use serde_json::Value;

use crate::{
    config::SanitizationConfig,
    error::{ExtractError, Rejection},
    models::ValidationResult,
    validation::{InputData, InputValidator, Model},
};

/// Layer that installs the sanitization settings the extractors pick up.
/// Without it the extractors fall back to [`SanitizationConfig::default`].
pub fn validation_layer(config: SanitizationConfig) -> Extension<Arc<SanitizationConfig>> {
    Extension(Arc::new(config))
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Reads the request body into input data according to its content type.
///
/// JSON bodies must be objects, form bodies keep repeated keys, multipart
/// bodies contribute their text parts. Any other content type yields empty
/// input.
pub async fn request_data(req: Request) -> Result<InputData, ExtractError> {
    let content_type = content_type(req.headers());

    if content_type.starts_with("application/json") {
        let body = read_body(req).await?;
        return json_data(&body);
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let body = read_body(req).await?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&body)?;
        return Ok(InputData::from_pairs(pairs));
    }

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(req, &())
            .await
            .map_err(|rejection| ExtractError::InvalidMultipart(rejection.body_text()))?;
        return multipart_data(multipart).await;
    }

    tracing::debug!(content_type = %content_type, "Unsupported content type, using empty input");
    Ok(InputData::new())
}

async fn read_body(req: Request) -> Result<Bytes, ExtractError> {
    Bytes::from_request(req, &())
        .await
        .map_err(|rejection| ExtractError::Body(rejection.body_text()))
}

fn json_data(body: &[u8]) -> Result<InputData, ExtractError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(InputData::new());
    }
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(InputData::from(map)),
        Value::Null => Ok(InputData::new()),
        _ => Err(ExtractError::JsonNotObject),
    }
}

async fn multipart_data(mut multipart: Multipart) -> Result<InputData, ExtractError> {
    let mut data = InputData::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ExtractError::InvalidMultipart(err.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ExtractError::InvalidMultipart(err.body_text()))?;

        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => data.append(name, text),
            Err(_) => {
                tracing::debug!(field = %name, file_name = ?file_name, "Skipping binary multipart field");
            }
        }
    }

    Ok(data)
}

async fn validate_request<T>(req: Request) -> Result<ValidationResult<T>, Rejection>
where
    T: Model + Send,
{
    let config = req
        .extensions()
        .get::<Arc<SanitizationConfig>>()
        .cloned()
        .unwrap_or_default();
    let validator = InputValidator::<T>::with_shared_config(config)?;
    let data = request_data(req).await?;
    Ok(validator.validate(&data).await)
}

/// Hands the handler the full [`ValidationResult`], valid or not. Only an
/// unreadable body is rejected.
#[derive(Debug)]
pub struct Validated<T>(pub ValidationResult<T>);

impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: Model + Send,
{
    type Rejection = Rejection;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        validate_request(req).await.map(Validated)
    }
}

/// Yields the validated model, rejecting invalid input with `422` and the
/// error details.
#[derive(Debug)]
pub struct Sanitized<T>(pub T);

impl<S, T> FromRequest<S> for Sanitized<T>
where
    S: Send + Sync,
    T: Model + Send,
{
    type Rejection = Rejection;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let result = validate_request::<T>(req).await?;
        if !result.is_valid {
            tracing::debug!(errors = result.errors.len(), "Rejecting invalid input");
        }
        result
            .into_model()
            .map(Sanitized)
            .map_err(Rejection::Validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::json;

    fn request(content_type: &str, body: impl Into<Body>) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn json_objects_become_input() {
        let data = request_data(request("application/json", r#"{"name":"Ann","ids":[1,2]}"#))
            .await
            .expect("data");
        assert_eq!(data.get("name"), Some(&json!("Ann")));
        assert_eq!(data.get_all("ids"), &[json!([1, 2])]);
    }

    #[tokio::test]
    async fn json_content_type_with_charset_is_accepted() {
        let data = request_data(request("Application/JSON; charset=utf-8", r#"{"a":1}"#))
            .await
            .expect("data");
        assert_eq!(data.get("a"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn empty_json_body_is_empty_input() {
        let data = request_data(request("application/json", ""))
            .await
            .expect("data");
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn json_arrays_are_rejected() {
        let err = request_data(request("application/json", "[1,2]"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::JsonNotObject));
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let err = request_data(request("application/json", "{nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn url_encoded_forms_keep_repeated_keys() {
        let data = request_data(request(
            "application/x-www-form-urlencoded",
            "name=%3Cb%3EJohn%3C%2Fb%3E&friends=2&friends=3",
        ))
        .await
        .expect("data");
        assert_eq!(data.get("name"), Some(&json!("<b>John</b>")));
        assert_eq!(data.get_all("friends"), &[json!("2"), json!("3")]);
    }

    #[tokio::test]
    async fn multipart_text_fields_are_collected() {
        let body = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"name\"\r\n\r\n",
            "Ann\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"friends\"\r\n\r\n",
            "4\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"friends\"\r\n\r\n",
            "5\r\n",
            "--XBOUNDARY--\r\n",
        );
        let data = request_data(request("multipart/form-data; boundary=XBOUNDARY", body))
            .await
            .expect("data");
        assert_eq!(data.get("name"), Some(&json!("Ann")));
        assert_eq!(data.get_all("friends"), &[json!("4"), json!("5")]);
    }

    #[tokio::test]
    async fn other_content_types_yield_empty_input() {
        let data = request_data(request("text/plain", "name=Ann"))
            .await
            .expect("data");
        assert!(data.is_empty());
    }
}
