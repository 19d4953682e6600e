use axum::{Router, extract::DefaultBodyLimit};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::AppState;
use crate::config::AppConfig;
use crate::services::backend::Backend;

pub fn build_router(state: Arc<AppState>, body_limit: usize) -> Router {
    let api_routes = crate::api::routes(state.clone());

    Router::new()
        .nest("/api", api_routes)
        .merge(crate::api::downloads::routes(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn register_routes(config: &AppConfig) -> anyhow::Result<Router> {
    let backend = Backend::connect(config).await?;

    if crate::tasks::cleanup::start_cleanup_task(backend.clone(), config.cleanup_interval_secs)
        .is_some()
    {
        tracing::info!(
            "File cleanup task started (interval: {}s)",
            config.cleanup_interval_secs
        );
    }

    let state = Arc::new(AppState::new(backend, config));

    Ok(build_router(state, config.body_limit()))
}
