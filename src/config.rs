use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::url_codec::DEFAULT_STORAGE_HOST;
use crate::domain::value_objects::BucketId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Failed to read {path}: {source}")]
    CredentialFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_bucket: Option<String>,
    pub storage_root: Option<PathBuf>,
    pub storage_host: String,
    /// Default listing prefix when a command does not pass one
    pub storage_prefix: String,
    pub database_url: Option<String>,
    pub database_url_file: Option<PathBuf>,
    // Database connection pool settings
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            storage_bucket: var("STORAGE_BUCKET").or_else(|| var("VITE_FIREBASE_STORAGE_BUCKET")),
            storage_root: var("STORAGE_ROOT").map(PathBuf::from),
            storage_host: var("STORAGE_HOST").unwrap_or_else(|| DEFAULT_STORAGE_HOST.to_string()),
            storage_prefix: var("STORAGE_PREFIX").unwrap_or_default(),
            database_url: var("DATABASE_URL"),
            database_url_file: var("DATABASE_URL_FILE").map(PathBuf::from),
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            db_acquire_timeout_secs: var("DB_ACQUIRE_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            log_format: match var("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        }
    }

    /// Validate whatever is set. Required-ness is checked by the accessors,
    /// since each command needs a different subset.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.database_url {
            validate_database_url(url)?;
        }

        if let Some(bucket) = &self.storage_bucket {
            BucketId::new(bucket).map_err(|e| ConfigError::Invalid {
                name: "STORAGE_BUCKET",
                reason: e.to_string(),
            })?;
        }

        if self.storage_host.contains('/') {
            return Err(ConfigError::Invalid {
                name: "STORAGE_HOST",
                reason: "must be a bare host name".to_string(),
            });
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: "DB_MAX_CONNECTIONS",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn bucket(&self) -> Result<BucketId, ConfigError> {
        let raw = self
            .storage_bucket
            .as_deref()
            .ok_or(ConfigError::Missing("STORAGE_BUCKET"))?;
        BucketId::new(raw).map_err(|e| ConfigError::Invalid {
            name: "STORAGE_BUCKET",
            reason: e.to_string(),
        })
    }

    pub fn storage_root(&self) -> Result<&Path, ConfigError> {
        self.storage_root
            .as_deref()
            .ok_or(ConfigError::Missing("STORAGE_ROOT"))
    }

    /// `DATABASE_URL`, or the first line of the file named by `DATABASE_URL_FILE`
    pub fn database_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }

        let path = self
            .database_url_file
            .as_ref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::CredentialFile {
            path: path.clone(),
            source,
        })?;
        let url = contents.lines().next().unwrap_or_default().trim().to_string();
        validate_database_url(&url)?;
        Ok(url)
    }

    /// Prefix given on the command line, else `STORAGE_PREFIX`
    pub fn prefix_or_default(&self, prefix: Option<String>) -> String {
        prefix.unwrap_or_else(|| self.storage_prefix.clone())
    }
}

fn validate_database_url(url: &str) -> Result<(), ConfigError> {
    if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
        return Err(ConfigError::Invalid {
            name: "DATABASE_URL",
            reason: "must start with postgres:// or postgresql://".to_string(),
        });
    }
    Ok(())
}
