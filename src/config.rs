//! Configuration management for the Folio store

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::fragment::{DEFAULT_CHUNK_SIZE, DEFAULT_FRAGMENT_THRESHOLD};
use crate::storage::{
    BackendKind, DEFAULT_CAPACITY_CEILING, DEFAULT_DURABLE_QUOTA, DEFAULT_SESSION_QUOTA,
};
use crate::token::DEFAULT_TOKEN_KEY;

/// Default logical key the library is stored under
pub const DEFAULT_STORAGE_KEY: &str = "ebooks";

/// Default quiet interval before a debounced save fires
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub storage: StorageConfig,
    pub fragments: FragmentConfig,
    pub durable: DurableConfig,
    pub session: SessionConfig,
    /// Quiet interval for debounced saves, in milliseconds
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Logical key of the library payload
    pub key: String,
    /// Key of the per-backend access token
    pub token_key: String,
    /// Backend tried first
    pub preferred: BackendKind,
    /// Advisory size ceiling in bytes
    pub capacity_ceiling: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FragmentConfig {
    /// Payloads of at least this many bytes are fragmented
    pub threshold: usize,
    /// Code points per fragment
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DurableConfig {
    pub path: PathBuf,
    pub quota: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub quota: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            storage: StorageConfig {
                key: DEFAULT_STORAGE_KEY.to_string(),
                token_key: DEFAULT_TOKEN_KEY.to_string(),
                preferred: BackendKind::Durable,
                capacity_ceiling: DEFAULT_CAPACITY_CEILING,
            },
            fragments: FragmentConfig {
                threshold: DEFAULT_FRAGMENT_THRESHOLD,
                chunk_size: DEFAULT_CHUNK_SIZE,
            },
            durable: DurableConfig {
                path: PathBuf::from("./folio-data"),
                quota: DEFAULT_DURABLE_QUOTA,
            },
            session: SessionConfig {
                quota: DEFAULT_SESSION_QUOTA,
            },
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl StoreConfig {
    /// Load a `.env` file if present, then read the environment
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read `FOLIO_*` variables, falling back to defaults for unset ones
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = StoreConfig::default();

        Ok(StoreConfig {
            storage: StorageConfig {
                key: env::var("FOLIO_STORAGE_KEY").unwrap_or(defaults.storage.key),
                token_key: env::var("FOLIO_TOKEN_KEY").unwrap_or(defaults.storage.token_key),
                preferred: match env::var("FOLIO_PREFERRED_BACKEND")
                    .unwrap_or_else(|_| "durable".to_string())
                    .as_str()
                {
                    "session" => BackendKind::Session,
                    _ => BackendKind::Durable,
                },
                capacity_ceiling: parse_var(
                    "FOLIO_CAPACITY_CEILING",
                    defaults.storage.capacity_ceiling,
                )?,
            },
            fragments: FragmentConfig {
                threshold: parse_var("FOLIO_FRAGMENT_THRESHOLD", defaults.fragments.threshold)?,
                chunk_size: parse_var("FOLIO_CHUNK_SIZE", defaults.fragments.chunk_size)?,
            },
            durable: DurableConfig {
                path: env::var("FOLIO_DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.durable.path),
                quota: parse_var("FOLIO_DURABLE_QUOTA", defaults.durable.quota)?,
            },
            session: SessionConfig {
                quota: parse_var("FOLIO_SESSION_QUOTA", defaults.session.quota)?,
            },
            debounce_ms: parse_var("FOLIO_DEBOUNCE_MS", defaults.debounce_ms)?,
        })
    }

    /// Debounce interval as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.storage.key, "ebooks");
        assert_eq!(config.storage.preferred, BackendKind::Durable);
        assert_eq!(config.fragments.threshold, 2 * 1024 * 1024);
        assert_eq!(config.fragments.chunk_size, 1024 * 1024);
        assert_eq!(config.storage.capacity_ceiling, 4 * 1024 * 1024);
        assert_eq!(config.debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_parse_var_default_when_unset() {
        let value: usize = parse_var("FOLIO_TEST_SURELY_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_deserialize() {
        let config: StoreConfig = serde_json::from_value(serde_json::json!({
            "storage": {
                "key": "books",
                "token_key": "tok",
                "preferred": "session",
                "capacity_ceiling": 1024
            },
            "fragments": {"threshold": 64, "chunk_size": 16},
            "durable": {"path": "/tmp/folio", "quota": 4096},
            "session": {"quota": 2048},
            "debounce_ms": 250
        }))
        .unwrap();

        assert_eq!(config.storage.preferred, BackendKind::Session);
        assert_eq!(config.fragments.chunk_size, 16);
        assert_eq!(config.debounce(), Duration::from_millis(250));
    }
}
