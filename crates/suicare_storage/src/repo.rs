#![forbid(unsafe_code)]

use std::sync::Arc;

use suicare_kernel_contracts::{Salt, SaltRecord, SubjectId};

use crate::salt_store::StorageError;

/// Typed repository interface for subject -> salt persistence.
///
/// Implementations must make `insert_if_absent` atomic with respect to other
/// inserts for the same subject, and must not report a salt as stored until
/// it is durable.
pub trait SaltStore: Send + Sync {
    fn read(&self, subject: &SubjectId) -> Result<Option<Salt>, StorageError>;

    /// Stores `record` unless the subject already has a salt.
    /// Returns whichever salt is stored for the subject afterwards.
    fn insert_if_absent(&self, record: SaltRecord) -> Result<Salt, StorageError>;

    fn record_count(&self) -> Result<usize, StorageError>;
}

impl<T: SaltStore + ?Sized> SaltStore for Arc<T> {
    fn read(&self, subject: &SubjectId) -> Result<Option<Salt>, StorageError> {
        (**self).read(subject)
    }

    fn insert_if_absent(&self, record: SaltRecord) -> Result<Salt, StorageError> {
        (**self).insert_if_absent(record)
    }

    fn record_count(&self) -> Result<usize, StorageError> {
        (**self).record_count()
    }
}
