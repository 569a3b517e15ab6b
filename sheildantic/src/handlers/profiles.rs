use axum::{http::StatusCode, Json};

use crate::{
    extract::{Sanitized, Validated},
    models::{profile::Profile, ValidationResult},
};

/// Echoes the full validation result: `200` when valid, `422` otherwise.
pub async fn submit_profile(
    Validated(result): Validated<Profile>,
) -> (StatusCode, Json<ValidationResult<Profile>>) {
    let status = if result.is_valid {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    tracing::info!(
        is_valid = result.is_valid,
        errors = result.errors.len(),
        "Profile submission validated"
    );
    (status, Json(result))
}

pub async fn create_profile(Sanitized(profile): Sanitized<Profile>) -> (StatusCode, Json<Profile>) {
    tracing::info!(handle = %profile.handle, "Profile accepted");
    (StatusCode::CREATED, Json(profile))
}

pub async fn health() -> &'static str {
    "ok"
}
