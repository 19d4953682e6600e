use chrono::{DateTime, Duration, Utc};

use crate::config::AppConfig;
use crate::models::file::FileRecord;
use crate::services::backend::Backend;
use crate::services::file_records::insert_record;
use crate::utils::crypto::hash_password;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::{validate_expiry_minutes, validate_file_size, validate_filename};

pub struct UploadRequest {
    pub filename: String,
    pub data: Vec<u8>,
    /// `None` and `Some("")` both mean no password gate.
    pub password: Option<String>,
    pub expires_in_minutes: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_upload_bytes: usize,
    pub max_expiry_minutes: i64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 50 * 1024 * 1024,
            max_expiry_minutes: 7 * 24 * 60,
        }
    }
}

impl From<&AppConfig> for UploadLimits {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            max_expiry_minutes: config.max_expiry_minutes,
        }
    }
}

pub fn share_link(origin: &str, file_id: &str) -> String {
    format!("{}/download/{}", origin.trim_end_matches('/'), file_id)
}

pub async fn upload_file(
    backend: &Backend,
    request: UploadRequest,
    limits: UploadLimits,
) -> AppResult<FileRecord> {
    upload_file_at(backend, request, limits, Utc::now()).await
}

/// Writes the bytes first and the metadata row second, so a row never points
/// at bytes that were not stored. A failed row insert leaves the object behind.
pub async fn upload_file_at(
    backend: &Backend,
    request: UploadRequest,
    limits: UploadLimits,
    now: DateTime<Utc>,
) -> AppResult<FileRecord> {
    validate_filename(&request.filename)?;
    validate_file_size(&request.data, limits.max_upload_bytes)?;
    validate_expiry_minutes(request.expires_in_minutes, limits.max_expiry_minutes)?;

    let password_hash = request
        .password
        .as_deref()
        .filter(|password| !password.is_empty())
        .map(hash_password);

    let file = Duration::try_minutes(request.expires_in_minutes)
        .and_then(|expires_in| {
            FileRecord::new(
                request.filename,
                request.data.len() as i64,
                password_hash,
                expires_in,
                now,
            )
        })
        .ok_or_else(|| AppError::Validation("Expiration is too far in the future".to_string()))?;

    tracing::info!(
        "Uploading file: id={}, name={}, size={} bytes, password={}",
        file.id,
        file.filename,
        file.file_size,
        file.requires_password()
    );

    backend.storage.put(&file.file_path, request.data).await?;

    if let Err(e) = insert_record(&backend.db, &file).await {
        tracing::error!(
            "Metadata write failed after storing object {}: {}",
            file.file_path,
            e
        );
        return Err(e);
    }

    tracing::info!("File saved: id={}, expires_at={}", file.id, file.expires_at);

    Ok(file)
}
