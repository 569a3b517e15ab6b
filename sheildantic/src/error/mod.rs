use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::ValidationErrorDetail;

/// A sanitization configuration the HTML sanitizer cannot honor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("`{0}` is listed both as an allowed tag and as a clean-content tag")]
    TagConflict(String),
    #[error("`{0}` has allowed attributes but is also a clean-content tag")]
    AttributeConflict(String),
    #[error("the `rel` attribute cannot be allowed while `link_rel` is set")]
    RelConflict,
    #[error("invalid value {value:?} for {key}")]
    InvalidVar { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("Field exceeds maximum size {limit}")]
    FieldTooLarge { field: String, limit: usize },
}

impl SanitizeError {
    pub fn field(&self) -> &str {
        match self {
            SanitizeError::FieldTooLarge { field, .. } => field,
        }
    }
}

/// Failures turning a request body into input data.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to read request body: {0}")]
    Body(String),
    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("JSON body must be an object")]
    JsonNotObject,
    #[error("Invalid form body: {0}")]
    InvalidForm(#[from] serde_urlencoded::de::Error),
    #[error("Invalid multipart body: {0}")]
    InvalidMultipart(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Rejection returned by the request extractors.
#[derive(Debug)]
pub enum Rejection {
    BadRequest(String),
    Validation(Vec<ValidationErrorDetail>),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let (status, error_message, code, details) = match self {
            Rejection::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg,
                "BAD_REQUEST".to_string(),
                None,
            ),
            Rejection::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation failed".to_string(),
                "VALIDATION_ERROR".to_string(),
                Some(serde_json::json!({ "errors": errors })),
            ),
            Rejection::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

impl From<ExtractError> for Rejection {
    fn from(err: ExtractError) -> Self {
        Rejection::BadRequest(err.to_string())
    }
}

impl From<ConfigError> for Rejection {
    fn from(err: ConfigError) -> Self {
        Rejection::InternalServerError(err.into())
    }
}

impl From<anyhow::Error> for Rejection {
    fn from(err: anyhow::Error) -> Self {
        Rejection::InternalServerError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn bad_request_maps_status_and_body() {
        let response = Rejection::BadRequest("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"], "bad");
        assert_eq!(json["code"], "BAD_REQUEST");
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn validation_includes_error_details() {
        let detail = ValidationErrorDetail::new("name", "Field required");
        let response = Rejection::Validation(vec![detail]).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["details"]["errors"][0]["field"], "name");
        assert_eq!(json["details"]["errors"][0]["message"], "Field required");
    }

    #[tokio::test]
    async fn internal_maps_to_generic_message() {
        let response = Rejection::InternalServerError(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Internal server error");
        assert_eq!(json["code"], "INTERNAL_SERVER_ERROR");
        assert!(json["details"].is_null());
    }

    #[tokio::test]
    async fn config_errors_are_server_side() {
        let response = Rejection::from(ConfigError::RelConflict).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn extract_errors_become_bad_requests() {
        let rejection = Rejection::from(ExtractError::JsonNotObject);
        match rejection {
            Rejection::BadRequest(msg) => assert_eq!(msg, "JSON body must be an object"),
            other => panic!("unexpected rejection: {:?}", other),
        }
    }

    #[test]
    fn field_too_large_message_names_the_limit() {
        let err = SanitizeError::FieldTooLarge {
            field: "name".to_string(),
            limit: 256,
        };
        assert_eq!(err.to_string(), "Field exceeds maximum size 256");
        assert_eq!(err.field(), "name");
    }
}
