#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use suicare_kernel_contracts::{ContractViolation, Salt, SaltRecord, SubjectId};
use suicare_storage::{SaltStore, StorageError};
use tracing::{error, info};

use crate::salt_generator::{OsRngSaltGenerator, SaltGenerator};

#[derive(Debug)]
pub enum RegistryError {
    InvalidRequest(ContractViolation),
    StorageFailure(StorageError),
    EntropyUnavailable(rand::Error),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(v) => write!(f, "invalid request: {v}"),
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
            Self::EntropyUnavailable(err) => write!(f, "entropy source unavailable: {err}"),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRequest(v) => Some(v),
            Self::StorageFailure(err) => Some(err),
            Self::EntropyUnavailable(err) => Some(err),
        }
    }
}

impl From<StorageError> for RegistryError {
    fn from(value: StorageError) -> Self {
        Self::StorageFailure(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaltIssueOutcome {
    Created,
    Reused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltIssue {
    pub subject: SubjectId,
    pub salt: Salt,
    pub outcome: SaltIssueOutcome,
}

/// Issue-once, return-consistently mapping from subject to salt.
#[derive(Clone)]
pub struct SaltRegistry {
    store: Arc<dyn SaltStore>,
    generator: Arc<dyn SaltGenerator>,
}

impl SaltRegistry {
    pub fn new(store: Arc<dyn SaltStore>, generator: Arc<dyn SaltGenerator>) -> Self {
        Self { store, generator }
    }

    pub fn with_os_rng(store: Arc<dyn SaltStore>) -> Self {
        Self::new(store, Arc::new(OsRngSaltGenerator))
    }

    pub fn store(&self) -> &dyn SaltStore {
        self.store.as_ref()
    }

    pub fn get_or_create_salt(&self, subject: Option<&str>) -> Result<Salt, RegistryError> {
        self.issue_salt(subject).map(|issue| issue.salt)
    }

    /// Returns the subject's salt, minting and persisting one on first sight.
    ///
    /// A freshly generated salt is only returned if the store accepted it;
    /// when a concurrent caller won the insert, the winner's salt is returned.
    pub fn issue_salt(&self, subject: Option<&str>) -> Result<SaltIssue, RegistryError> {
        let subject = parse_subject(subject)?;
        let fingerprint = subject_fingerprint(&subject);

        if let Some(salt) = self.read_existing(&subject, &fingerprint)? {
            info!(subject = %fingerprint, "returning existing salt");
            return Ok(SaltIssue {
                subject,
                salt,
                outcome: SaltIssueOutcome::Reused,
            });
        }

        let fresh = self.generator.generate().map_err(|err| {
            error!(subject = %fingerprint, error = %err, "salt generation failed");
            RegistryError::EntropyUnavailable(err)
        })?;
        let stored = self
            .store
            .insert_if_absent(SaltRecord::new(subject.clone(), fresh.clone()))
            .map_err(|err| {
                error!(subject = %fingerprint, error = %err, "salt persist failed");
                RegistryError::StorageFailure(err)
            })?;

        let outcome = if stored == fresh {
            info!(subject = %fingerprint, "new subject, generated salt");
            SaltIssueOutcome::Created
        } else {
            info!(subject = %fingerprint, "lost insert race, returning stored salt");
            SaltIssueOutcome::Reused
        };
        Ok(SaltIssue {
            subject,
            salt: stored,
            outcome,
        })
    }

    fn read_existing(
        &self,
        subject: &SubjectId,
        fingerprint: &str,
    ) -> Result<Option<Salt>, RegistryError> {
        self.store.read(subject).map_err(|err| {
            error!(subject = %fingerprint, error = %err, "salt lookup failed");
            RegistryError::StorageFailure(err)
        })
    }
}

fn parse_subject(raw: Option<&str>) -> Result<SubjectId, RegistryError> {
    let raw = raw.ok_or(RegistryError::InvalidRequest(
        ContractViolation::InvalidValue {
            field: "subject",
            reason: "must be present",
        },
    ))?;
    SubjectId::new(raw).map_err(RegistryError::InvalidRequest)
}

/// Short stable tag for a subject, safe to put in logs.
pub fn subject_fingerprint(subject: &SubjectId) -> String {
    let digest = Sha256::digest(subject.as_str().as_bytes());
    digest[..6].iter().map(|b| format!("{b:02x}")).collect()
}
