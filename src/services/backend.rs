use std::sync::Arc;

use crate::config::{AppConfig, StorageBackend};
use crate::database::{self, DbPool};
use crate::services::object_store::{LocalObjectStore, ObjectStore, SupabaseObjectStore};
use crate::utils::error::AppResult;

/// Handles to the metadata table and the object store, built once at startup
/// and handed to every flow.
#[derive(Clone)]
pub struct Backend {
    pub db: DbPool,
    pub storage: Arc<dyn ObjectStore>,
}

impl Backend {
    pub fn new(db: DbPool, storage: Arc<dyn ObjectStore>) -> Self {
        Self { db, storage }
    }

    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let db = database::create_pool(&config.database_url).await?;
        tracing::info!("Database connected and migrations applied");

        let storage: Arc<dyn ObjectStore> = match &config.storage {
            StorageBackend::Local { upload_dir } => {
                tracing::info!("Using local object store at {}", upload_dir);
                Arc::new(LocalObjectStore::new(upload_dir))
            }
            StorageBackend::Supabase {
                url,
                service_key,
                bucket,
            } => {
                tracing::info!("Using Supabase object store: {} (bucket {})", url, bucket);
                Arc::new(SupabaseObjectStore::new(url, service_key.clone(), bucket.clone())?)
            }
        };

        Ok(Self::new(db, storage))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::services::object_store::memory::MemoryObjectStore;

    pub async fn memory_backend() -> (Backend, Arc<MemoryObjectStore>) {
        let db = database::in_memory_pool().await.unwrap();
        let store = Arc::new(MemoryObjectStore::default());
        (Backend::new(db, store.clone()), store)
    }
}
