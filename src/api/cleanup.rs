use axum::{Json, Router, extract::State, routing::post};
use std::sync::Arc;

use crate::api::AppState;
use crate::tasks::cleanup::{SweepReport, sweep_expired_files};
use crate::utils::error::AppResult;

async fn run_sweep(State(state): State<Arc<AppState>>) -> AppResult<Json<SweepReport>> {
    Ok(Json(sweep_expired_files(&state.backend).await?))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(run_sweep))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::cleanup_auth_middleware,
        ))
        .with_state(state)
}
