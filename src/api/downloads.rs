use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use std::fmt::Write;
use std::sync::Arc;

use crate::api::AppState;
use crate::services::download::{DownloadedFile, download_file};
use crate::utils::error::AppResult;

#[derive(Deserialize)]
struct DownloadPayload {
    password: Option<String>,
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987
/// `filename*` carrying the exact UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::with_capacity(filename.len() * 3);
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{:02X}", byte);
        }
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

fn file_response(file: DownloadedFile) -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                mime::APPLICATION_OCTET_STREAM.to_string(),
            ),
            (header::CONTENT_DISPOSITION, content_disposition(&file.filename)),
        ],
        file.data,
    )
}

async fn download(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let file = download_file(&state.backend, &file_id, None).await?;
    Ok(file_response(file))
}

async fn download_with_password(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    Json(req): Json<DownloadPayload>,
) -> AppResult<impl IntoResponse> {
    let file = download_file(&state.backend, &file_id, req.password.as_deref()).await?;
    Ok(file_response(file))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/download/:file_id", get(download).post(download_with_password))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_keeps_plain_names() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf"
        );
    }

    #[test]
    fn disposition_escapes_quotes_and_unicode() {
        assert_eq!(
            content_disposition("my \"résumé\".txt"),
            "attachment; filename=\"my _r_sum__.txt\"; filename*=UTF-8''my%20%22r%C3%A9sum%C3%A9%22.txt"
        );
    }
}
