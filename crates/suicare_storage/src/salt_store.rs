#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::RwLock;

use suicare_kernel_contracts::{Salt, SaltRecord, SubjectId};

use crate::repo::SaltStore;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Corrupt { path: PathBuf, reason: String },
    LockPoisoned,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "json error: {err}"),
            Self::Corrupt { path, reason } => {
                write!(f, "salt store '{}' is corrupt: {reason}", path.display())
            }
            Self::LockPoisoned => write!(f, "salt store lock poisoned"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Corrupt { .. } | Self::LockPoisoned => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Volatile store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemSaltStore {
    records: RwLock<BTreeMap<SubjectId, Salt>>,
}

impl MemSaltStore {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = SaltRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.subject, record.salt))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }
}

impl SaltStore for MemSaltStore {
    fn read(&self, subject: &SubjectId) -> Result<Option<Salt>, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.get(subject).cloned())
    }

    fn insert_if_absent(&self, record: SaltRecord) -> Result<Salt, StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(records
            .entry(record.subject)
            .or_insert(record.salt)
            .clone())
    }

    fn record_count(&self) -> Result<usize, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.len())
    }
}
