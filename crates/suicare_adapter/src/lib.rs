#![forbid(unsafe_code)]

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use suicare_engines::{RegistryError, SaltIssue, SaltRegistry};
use suicare_kernel_contracts::wire::{
    HealthResponse, SaltResponse, MISSING_SUBJECT_ERROR, STORAGE_UNAVAILABLE_ERROR,
};
use suicare_storage::{JsonFileSaltStore, MemSaltStore, SaltStore};

pub mod http;

pub use http::router;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SALT_DB_PATH: &str = "salt_db.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaltStoreConfig {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub bind: SocketAddr,
    pub store: SaltStoreConfig,
}

impl AdapterConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_env_var_map(|key| env::var(key).ok())
    }

    pub fn from_env_var_map<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind = match read("SUICARE_HTTP_BIND") {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .map_err(|err| format!("invalid SUICARE_HTTP_BIND '{raw}': {err}"))?,
            None => {
                let port = match read("PORT") {
                    Some(raw) => raw
                        .parse::<u16>()
                        .map_err(|err| format!("invalid PORT '{raw}': {err}"))?,
                    None => DEFAULT_PORT,
                };
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let store_kind = read("SUICARE_SALT_STORE").map(|v| v.to_ascii_lowercase());
        let store = match store_kind.as_deref() {
            None | Some("file") => SaltStoreConfig::File(
                read("SUICARE_SALT_DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SALT_DB_PATH)),
            ),
            Some("memory") => SaltStoreConfig::Memory,
            Some(other) => {
                return Err(format!(
                    "invalid SUICARE_SALT_STORE '{other}': expected one of: file, memory"
                ))
            }
        };

        Ok(Self { bind, store })
    }
}

/// Why a salt lookup was refused, as seen by the HTTP layer.
#[derive(Debug)]
pub enum SaltLookupFailure {
    InvalidRequest(String),
    Unavailable(String),
}

impl SaltLookupFailure {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::Unavailable(_) => 500,
        }
    }

    /// Body text for the client. Internal detail stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => MISSING_SUBJECT_ERROR,
            Self::Unavailable(_) => STORAGE_UNAVAILABLE_ERROR,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidRequest(detail) | Self::Unavailable(detail) => detail,
        }
    }
}

impl From<RegistryError> for SaltLookupFailure {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::InvalidRequest(_) => Self::InvalidRequest(value.to_string()),
            RegistryError::StorageFailure(_) | RegistryError::EntropyUnavailable(_) => {
                Self::Unavailable(value.to_string())
            }
        }
    }
}

#[derive(Clone)]
pub struct AdapterRuntime {
    registry: SaltRegistry,
}

impl AdapterRuntime {
    pub fn new(registry: SaltRegistry) -> Self {
        Self { registry }
    }

    pub fn new_in_memory() -> Self {
        Self::new(SaltRegistry::with_os_rng(Arc::new(
            MemSaltStore::new_in_memory(),
        )))
    }

    pub fn from_config(config: &AdapterConfig) -> Result<Self, String> {
        let store: Arc<dyn SaltStore> = match &config.store {
            SaltStoreConfig::Memory => Arc::new(MemSaltStore::new_in_memory()),
            SaltStoreConfig::File(path) => {
                Arc::new(JsonFileSaltStore::open(path).map_err(|err| {
                    format!("failed to open salt store '{}': {err}", path.display())
                })?)
            }
        };
        Ok(Self::new(SaltRegistry::with_os_rng(store)))
    }

    pub fn default_from_env() -> Result<Self, String> {
        Self::from_config(&AdapterConfig::from_env()?)
    }

    /// Blocking: may touch the backing store.
    pub fn run_salt_lookup(&self, sub: Option<&str>) -> Result<SaltResponse, SaltLookupFailure> {
        let SaltIssue { salt, .. } = self.registry.issue_salt(sub)?;
        Ok(SaltResponse {
            salt: salt.into_string(),
        })
    }

    pub fn health_report(&self) -> Result<HealthResponse, String> {
        let count = self
            .registry
            .store()
            .record_count()
            .map_err(|err| err.to_string())?;
        Ok(HealthResponse {
            status: "ok".to_string(),
            outcome: "HEALTHY".to_string(),
            reason: None,
            subject_count: Some(count as u64),
        })
    }
}
