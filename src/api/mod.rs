pub mod cleanup;
pub mod downloads;
pub mod files;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::backend::Backend;
use crate::services::upload::UploadLimits;

pub struct AppState {
    pub backend: Backend,
    pub public_origin: String,
    pub limits: UploadLimits,
    pub cleanup_token: Option<String>,
}

impl AppState {
    pub fn new(backend: Backend, config: &AppConfig) -> Self {
        Self {
            backend,
            public_origin: config.public_origin.clone(),
            limits: UploadLimits::from(config),
            cleanup_token: config.cleanup_token.clone(),
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/files", files::routes(state.clone()))
        .nest("/cleanup", cleanup::routes(state))
}
