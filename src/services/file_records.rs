use chrono::{DateTime, Utc};

use crate::database::DbPool;
use crate::models::file::{FileRecord, format_timestamp};
use crate::utils::error::AppResult;

pub async fn insert_record(pool: &DbPool, file: &FileRecord) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO files (id, filename, file_path, file_size, password_hash, expires_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&file.id)
    .bind(&file.filename)
    .bind(&file.file_path)
    .bind(file.file_size)
    .bind(&file.password_hash)
    .bind(&file.expires_at)
    .bind(&file.created_at)
    .execute(pool.as_ref())
    .await?;

    Ok(())
}

pub async fn find_record(pool: &DbPool, file_id: &str) -> AppResult<Option<FileRecord>> {
    let file = sqlx::query_as::<_, FileRecord>("SELECT * FROM files WHERE id = ?")
        .bind(file_id)
        .fetch_optional(pool.as_ref())
        .await?;

    Ok(file)
}

pub async fn find_expired_records(
    pool: &DbPool,
    cutoff: DateTime<Utc>,
) -> AppResult<Vec<FileRecord>> {
    let files = sqlx::query_as::<_, FileRecord>(
        "SELECT * FROM files WHERE expires_at < ? ORDER BY expires_at",
    )
    .bind(format_timestamp(cutoff))
    .fetch_all(pool.as_ref())
    .await?;

    Ok(files)
}

/// Returns whether a row was removed.
pub async fn delete_record(pool: &DbPool, file_id: &str) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM files WHERE id = ?")
        .bind(file_id)
        .execute(pool.as_ref())
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_expired_records(pool: &DbPool, cutoff: DateTime<Utc>) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM files WHERE expires_at < ?")
        .bind(format_timestamp(cutoff))
        .execute(pool.as_ref())
        .await?;

    Ok(result.rows_affected())
}
