use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::backend::Backend;
use crate::services::file_records::{delete_expired_records, find_expired_records};
use crate::utils::error::AppResult;

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub deleted: u64,
    pub message: String,
}

impl SweepReport {
    fn empty() -> Self {
        Self {
            deleted: 0,
            message: "No expired files".to_string(),
        }
    }
}

pub async fn sweep_expired_files(backend: &Backend) -> AppResult<SweepReport> {
    sweep_expired_files_at(backend, Utc::now()).await
}

/// Purges every record whose `expires_at` is before `now`, objects first.
///
/// A failed object removal is logged and the rows are deleted anyway, so a
/// storage outage can leave orphaned objects but never rows pointing at
/// missing bytes. Select and delete share the cutoff, and the reported count
/// is what this run's delete removed, so overlapping sweeps do not double count.
pub async fn sweep_expired_files_at(backend: &Backend, now: DateTime<Utc>) -> AppResult<SweepReport> {
    tracing::info!("Starting cleanup of expired files");

    let expired = find_expired_records(&backend.db, now).await?;
    if expired.is_empty() {
        tracing::debug!("No expired files to delete");
        return Ok(SweepReport::empty());
    }

    tracing::info!("Found {} expired files to delete", expired.len());

    let keys: Vec<String> = expired.into_iter().map(|file| file.file_path).collect();
    match backend.storage.remove(&keys).await {
        Ok(()) => tracing::info!("Removed {} objects from storage", keys.len()),
        Err(e) => tracing::warn!(
            "Failed to remove {} expired objects from storage: {}",
            keys.len(),
            e
        ),
    }

    let deleted = delete_expired_records(&backend.db, now).await?;
    if deleted == 0 {
        tracing::debug!("Expired files were already removed by another sweep");
        return Ok(SweepReport::empty());
    }

    tracing::info!("Cleanup completed: {} files deleted", deleted);
    Ok(SweepReport {
        deleted,
        message: format!("Deleted {} expired files", deleted),
    })
}

/// Runs the sweep every `interval_secs` until the runtime shuts down. Zero disables it.
pub fn start_cleanup_task(
    backend: Backend,
    interval_secs: u64,
) -> Option<tokio::task::JoinHandle<()>> {
    if interval_secs == 0 {
        tracing::info!("File cleanup task disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));

        loop {
            interval.tick().await;

            match sweep_expired_files(&backend).await {
                Ok(report) => {
                    tracing::info!("File cleanup task completed: {} files cleaned", report.deleted);
                }
                Err(e) => {
                    tracing::error!("File cleanup task failed: {}", e);
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::file::FileRecord;
    use crate::services::backend::testing::memory_backend;
    use crate::services::file_records::find_record;
    use crate::services::object_store::{ObjectStore, StorageError};
    use crate::services::upload::{UploadLimits, UploadRequest, upload_file_at};
    use chrono::Duration;
    use std::sync::Arc;

    async fn upload_expiring(backend: &Backend, minutes: i64, now: DateTime<Utc>) -> FileRecord {
        upload_file_at(
            backend,
            UploadRequest {
                filename: "a.txt".to_string(),
                data: b"abc".to_vec(),
                password: None,
                expires_in_minutes: minutes,
            },
            UploadLimits::default(),
            now,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_files() {
        let (backend, store) = memory_backend().await;
        let now = Utc::now();
        let short = upload_expiring(&backend, 1, now).await;
        let long = upload_expiring(&backend, 60, now).await;

        let report = sweep_expired_files_at(&backend, now + Duration::minutes(5))
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert!(find_record(&backend.db, &short.id).await.unwrap().is_none());
        assert!(!store.contains(&short.file_path));
        assert!(find_record(&backend.db, &long.id).await.unwrap().is_some());
        assert!(store.contains(&long.file_path));
    }

    #[tokio::test]
    async fn second_sweep_is_a_no_op() {
        let (backend, _) = memory_backend().await;
        let now = Utc::now();
        upload_expiring(&backend, 1, now).await;
        upload_expiring(&backend, 2, now).await;
        let later = now + Duration::minutes(3);

        assert_eq!(sweep_expired_files_at(&backend, later).await.unwrap().deleted, 2);

        let again = sweep_expired_files_at(&backend, later).await.unwrap();
        assert_eq!(again.deleted, 0);
        assert_eq!(again.message, "No expired files");
    }

    #[tokio::test]
    async fn storage_failure_does_not_block_metadata_deletion() {
        let (backend, store) = memory_backend().await;
        let now = Utc::now();
        let file = upload_expiring(&backend, 1, now).await;
        store.set_fail_removes(true);

        let report = sweep_expired_files_at(&backend, now + Duration::minutes(2))
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert!(find_record(&backend.db, &file.id).await.unwrap().is_none());
        assert!(store.contains(&file.file_path));
    }

    #[tokio::test]
    async fn record_expiring_exactly_now_is_left_for_next_sweep() {
        let (backend, _) = memory_backend().await;
        let now = Utc::now();
        let file = upload_expiring(&backend, 1, now).await;

        let report = sweep_expired_files_at(&backend, file.expires_at_time())
            .await
            .unwrap();
        assert_eq!(report.deleted, 0);
    }

    #[tokio::test]
    async fn zero_interval_disables_task() {
        let (backend, _) = memory_backend().await;
        assert!(start_cleanup_task(backend, 0).is_none());
    }

    /// Deletes the expired rows itself while the sweep is removing objects,
    /// the way an overlapping sweep would.
    struct RacingStore {
        backend_db: crate::database::DbPool,
        cutoff: DateTime<Utc>,
    }

    #[async_trait::async_trait]
    impl ObjectStore for RacingStore {
        async fn put(&self, _key: &str, _data: Vec<u8>) -> Result<(), StorageError> {
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(key.to_string()))
        }

        async fn remove(&self, _keys: &[String]) -> Result<(), StorageError> {
            delete_expired_records(&self.backend_db, self.cutoff)
                .await
                .map_err(|e| StorageError::Io(std::io::Error::other(e.to_string())))?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn overlapping_sweep_reports_no_op() {
        let (backend, _) = memory_backend().await;
        let now = Utc::now();
        upload_expiring(&backend, 1, now).await;
        let later = now + Duration::minutes(2);

        let racing = Backend::new(
            backend.db.clone(),
            Arc::new(RacingStore {
                backend_db: backend.db.clone(),
                cutoff: later,
            }),
        );

        let report = sweep_expired_files_at(&racing, later).await.unwrap();
        assert_eq!(report.deleted, 0);
        assert_eq!(report.message, "No expired files");
    }
}
