use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::file::FileRecord;
use crate::services::backend::Backend;
use crate::services::file_records::{delete_record, find_record};
use crate::utils::crypto::verify_password;
use crate::utils::error::{AppError, AppResult};

/// What a recipient sees before downloading.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub id: String,
    pub filename: String,
    pub file_size: i64,
    pub requires_password: bool,
    pub expires_at: String,
    pub remaining_seconds: i64,
}

#[derive(Debug)]
pub struct DownloadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Looks a record up and enforces expiry on the spot: an expired record has
/// its object and row removed and is reported as [`AppError::Expired`].
pub async fn find_live_record(
    backend: &Backend,
    file_id: &str,
    now: DateTime<Utc>,
) -> AppResult<FileRecord> {
    tracing::debug!("Retrieving file: id={}", file_id);

    let file = find_record(&backend.db, file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    if file.is_expired_at(now) {
        tracing::info!(
            "File expired on access: id={}, expires_at={}",
            file.id,
            file.expires_at
        );
        purge_file(backend, &file).await?;
        return Err(AppError::Expired);
    }

    Ok(file)
}

/// Object first, then row. A failed object removal is logged and the row is
/// still deleted.
async fn purge_file(backend: &Backend, file: &FileRecord) -> AppResult<()> {
    if let Err(e) = backend
        .storage
        .remove(std::slice::from_ref(&file.file_path))
        .await
    {
        tracing::warn!(
            "Failed to remove object {} for expired file {}: {}",
            file.file_path,
            file.id,
            e
        );
    }

    delete_record(&backend.db, &file.id).await?;
    Ok(())
}

pub async fn file_info(backend: &Backend, file_id: &str) -> AppResult<FileInfo> {
    file_info_at(backend, file_id, Utc::now()).await
}

pub async fn file_info_at(
    backend: &Backend,
    file_id: &str,
    now: DateTime<Utc>,
) -> AppResult<FileInfo> {
    let file = find_live_record(backend, file_id, now).await?;

    Ok(FileInfo {
        remaining_seconds: file.remaining_seconds_at(now),
        requires_password: file.requires_password(),
        id: file.id,
        filename: file.filename,
        file_size: file.file_size,
        expires_at: file.expires_at,
    })
}

pub async fn download_file(
    backend: &Backend,
    file_id: &str,
    password: Option<&str>,
) -> AppResult<DownloadedFile> {
    download_file_at(backend, file_id, password, Utc::now()).await
}

pub async fn download_file_at(
    backend: &Backend,
    file_id: &str,
    password: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<DownloadedFile> {
    let file = find_live_record(backend, file_id, now).await?;

    if let Some(password_hash) = &file.password_hash {
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(AppError::PasswordRequired)?;

        if !verify_password(password, password_hash) {
            tracing::debug!("Incorrect password for file {}", file.id);
            return Err(AppError::PasswordIncorrect);
        }
    }

    let data = backend.storage.get(&file.file_path).await?;

    tracing::info!(
        "File downloaded: id={}, name={}, size={} bytes",
        file.id,
        file.filename,
        data.len()
    );

    Ok(DownloadedFile {
        filename: file.filename,
        data,
    })
}
