#![forbid(unsafe_code)]

//! Single-file JSON salt store.
//!
//! The file holds one JSON object mapping subject to salt, the same layout
//! the original `salt_db.json` used, so an existing file loads unchanged.
//! The whole map is read once at open and rewritten on every new subject.
//! Rewrites go through a temp file that is fsynced and renamed over the
//! target, so a crash leaves either the old or the new document on disk.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use suicare_kernel_contracts::{Salt, SaltRecord, SubjectId};

use crate::repo::SaltStore;
use crate::salt_store::StorageError;

#[derive(Debug)]
pub struct JsonFileSaltStore {
    path: PathBuf,
    records: RwLock<BTreeMap<SubjectId, Salt>>,
}

impl JsonFileSaltStore {
    /// Loads the store at `path`. A missing or blank file opens empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let records = load_document(&path)?;
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }
}

impl SaltStore for JsonFileSaltStore {
    fn read(&self, subject: &SubjectId) -> Result<Option<Salt>, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.get(subject).cloned())
    }

    fn insert_if_absent(&self, record: SaltRecord) -> Result<Salt, StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        if let Some(existing) = records.get(&record.subject) {
            return Ok(existing.clone());
        }

        let serialized = {
            let mut doc: BTreeMap<&str, &str> = records
                .iter()
                .map(|(subject, salt)| (subject.as_str(), salt.expose()))
                .collect();
            doc.insert(record.subject.as_str(), record.salt.expose());
            serde_json::to_vec_pretty(&doc)?
        };
        write_document(&self.path, &serialized)?;

        // Only visible once durable.
        records.insert(record.subject, record.salt.clone());
        Ok(record.salt)
    }

    fn record_count(&self) -> Result<usize, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.len())
    }
}

fn load_document(path: &Path) -> Result<BTreeMap<SubjectId, Salt>, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => return Err(err.into()),
    };
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let doc = serde_json::from_str::<BTreeMap<String, String>>(&raw).map_err(|err| {
        StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    })?;

    let mut records = BTreeMap::new();
    for (subject, salt) in doc {
        let subject = SubjectId::new(subject).map_err(|v| StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: v.to_string(),
        })?;
        let salt = Salt::new(salt).map_err(|v| StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("entry '{subject}': {v}"),
        })?;
        records.insert(subject, salt);
    }
    Ok(records)
}

fn write_document(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    atomic_write(path, data)?;
    Ok(())
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.to_path_buf();
    tmp.set_extension("tmp");

    let written = open_restricted(&tmp).and_then(|mut file| {
        file.write_all(data)?;
        file.sync_all()
    });
    if let Err(err) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    sync_parent_dir(path)
}

/// Salts are key material: the file is readable by the service user only.
fn open_restricted(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => File::open(parent)?.sync_all(),
        None => File::open(".")?.sync_all(),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
