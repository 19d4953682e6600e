use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::AppState;
use crate::services::download::{FileInfo, file_info};
use crate::services::upload::{UploadRequest, share_link, upload_file};
use crate::utils::error::{AppError, AppResult};

#[derive(Deserialize)]
struct UploadPayload {
    filename: String,
    data: String,
    password: Option<String>,
    expires_in_minutes: i64,
}

#[derive(Serialize)]
struct UploadResponse {
    id: String,
    link: String,
    filename: String,
    file_size: i64,
    expires_at: String,
}

async fn upload(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadPayload>,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let data = base64::engine::general_purpose::STANDARD
        .decode(&req.data)
        .map_err(|e| AppError::BadRequest(format!("Invalid base64: {}", e)))?;

    let file = upload_file(
        &state.backend,
        UploadRequest {
            filename: req.filename,
            data,
            password: req.password,
            expires_in_minutes: req.expires_in_minutes,
        },
        state.limits,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            link: share_link(&state.public_origin, &file.id),
            id: file.id,
            filename: file.filename,
            file_size: file.file_size,
            expires_at: file.expires_at,
        }),
    ))
}

async fn info(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> AppResult<Json<FileInfo>> {
    Ok(Json(file_info(&state.backend, &file_id).await?))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(upload))
        .route("/:file_id", get(info))
        .with_state(state)
}
