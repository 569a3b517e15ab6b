pub mod profiles;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};

use crate::config::SanitizationConfig;

/// Routes of the demo API, with `config` installed for the extractors.
pub fn router(config: Arc<SanitizationConfig>) -> Router {
    Router::new()
        .route("/health", get(profiles::health))
        .route("/api/profiles", post(profiles::submit_profile))
        .route("/api/profiles/strict", post(profiles::create_profile))
        .layer(Extension(config))
}
