//! Byte storage for uploaded files.
//!
//! The metadata table only records a key; the bytes live behind an
//! [`ObjectStore`]. Two backends exist: a directory on local disk and a
//! Supabase Storage bucket reached over its REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::json;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("invalid storage URL: {0}")]
    InvalidUrl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage API returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Removes every listed key. Keys that are already gone are skipped; the
    /// remaining keys are still attempted when one of them fails.
    async fn remove(&self, keys: &[String]) -> Result<(), StorageError>;
}

/// Stores each object as a single file directly under `root`.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || key == "."
            || key == ".."
            || key.contains('/')
            || key.contains('\\')
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).await?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::debug!("Wrote object {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut first_error = None;

        for key in keys {
            let result = match self.path_for(key) {
                Ok(path) => match fs::remove_file(&path).await {
                    Ok(()) => {
                        tracing::debug!("Deleted object from disk: {}", path.display());
                        Ok(())
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(StorageError::from(e)),
                },
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                tracing::warn!("Failed to delete object {}: {}", key, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Objects kept in a Supabase Storage bucket, authenticated with a service key.
pub struct SupabaseObjectStore {
    client: Client,
    base_url: Url,
    bucket: String,
    service_key: String,
}

impl SupabaseObjectStore {
    pub fn new(
        base_url: &str,
        service_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let base_url =
            Url::parse(base_url).map_err(|e| StorageError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            bucket: bucket.into(),
            service_key: service_key.into(),
        })
    }

    pub(crate) fn endpoint(&self, key: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "object", self.bucket.as_str()]);
            if let Some(key) = key {
                segments.push(key);
            }
        }
        url
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

async fn check_response(
    response: reqwest::Response,
    key: &str,
) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if is_not_found(status, &message) {
        return Err(StorageError::NotFound(key.to_string()));
    }

    Err(StorageError::Http {
        status: status.as_u16(),
        message,
    })
}

// The Storage API reports a missing object as a 400 with a JSON body in some versions.
fn is_not_found(status: StatusCode, body: &str) -> bool {
    status == StatusCode::NOT_FOUND
        || (status == StatusCode::BAD_REQUEST && body.to_lowercase().contains("not found"))
}

#[async_trait]
impl ObjectStore for SupabaseObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let size = data.len();
        let response = self
            .authorized(self.client.post(self.endpoint(Some(key))))
            .header("x-upsert", "false")
            .header(reqwest::header::CONTENT_TYPE, mime::APPLICATION_OCTET_STREAM.as_ref())
            .body(data)
            .send()
            .await?;
        check_response(response, key).await?;

        tracing::debug!("Uploaded object {} to bucket {} ({} bytes)", key, self.bucket, size);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .authorized(self.client.get(self.endpoint(Some(key))))
            .send()
            .await?;
        let response = check_response(response, key).await?;

        Ok(response.bytes().await?.to_vec())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        if keys.is_empty() {
            return Ok(());
        }

        let response = self
            .authorized(self.client.delete(self.endpoint(None)))
            .json(&json!({ "prefixes": keys }))
            .send()
            .await?;
        check_response(response, &keys.join(",")).await?;

        tracing::debug!("Removed {} objects from bucket {}", keys.len(), self.bucket);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-process store with switchable failures.
    #[derive(Default)]
    pub struct MemoryObjectStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
        pub fail_puts: AtomicBool,
        pub fail_removes: AtomicBool,
    }

    impl MemoryObjectStore {
        pub fn contains(&self, key: &str) -> bool {
            self.objects.lock().unwrap().contains_key(key)
        }

        pub fn object_count(&self) -> usize {
            self.objects.lock().unwrap().len()
        }

        pub fn set_fail_puts(&self, fail: bool) {
            self.fail_puts.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_removes(&self, fail: bool) {
            self.fail_removes.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryObjectStore {
        async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(StorageError::Http {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            self.objects.lock().unwrap().insert(key.to_string(), data);
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            self.objects
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(key.to_string()))
        }

        async fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
            if self.fail_removes.load(Ordering::SeqCst) {
                return Err(StorageError::Http {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            let mut objects = self.objects.lock().unwrap();
            for key in keys {
                objects.remove(key);
            }
            Ok(())
        }
    }
}
