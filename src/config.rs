//! Runtime configuration, read from the environment.

use std::str::FromStr;

use crate::utils::error::{AppError, AppResult};

/// Ten years.
pub const EXPIRY_MINUTES_CEILING: i64 = 10 * 365 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Local {
        upload_dir: String,
    },
    Supabase {
        url: String,
        service_key: String,
        bucket: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    /// Origin that share links are built on, without a trailing slash.
    pub public_origin: String,
    pub storage: StorageBackend,
    /// Zero disables the in-process sweep.
    pub cleanup_interval_secs: u64,
    pub cleanup_token: Option<String>,
    pub max_upload_bytes: usize,
    pub max_expiry_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let storage = match get("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "local" => StorageBackend::Local {
                upload_dir: get("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()),
            },
            "supabase" => StorageBackend::Supabase {
                url: get("SUPABASE_URL")
                    .ok_or_else(|| AppError::Config("SUPABASE_URL not set".to_string()))?,
                service_key: get("SUPABASE_SERVICE_KEY")
                    .ok_or_else(|| AppError::Config("SUPABASE_SERVICE_KEY not set".to_string()))?,
                bucket: get("SUPABASE_BUCKET").unwrap_or_else(|| "files".to_string()),
            },
            other => {
                return Err(AppError::Config(format!(
                    "Unknown STORAGE_BACKEND '{}' (expected 'local' or 'supabase')",
                    other
                )));
            }
        };

        let max_expiry_minutes: i64 = parse_or(&get, "MAX_EXPIRY_MINUTES", 7 * 24 * 60)?;
        if !(1..=EXPIRY_MINUTES_CEILING).contains(&max_expiry_minutes) {
            return Err(AppError::Config(format!(
                "MAX_EXPIRY_MINUTES must be between 1 and {}",
                EXPIRY_MINUTES_CEILING
            )));
        }

        Ok(Self {
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://fileshare.db?mode=rwc".to_string()),
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            public_origin: get("PUBLIC_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            storage,
            cleanup_interval_secs: parse_or(&get, "CLEANUP_INTERVAL_SECS", 3600)?,
            cleanup_token: get("CLEANUP_TOKEN"),
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            max_expiry_minutes,
        })
    }

    /// Request body ceiling: base64 inflates the payload by a third, plus room for the JSON envelope.
    pub fn body_limit(&self) -> usize {
        self.max_upload_bytes / 3 * 4 + 64 * 1024
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {} '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}
