#![forbid(unsafe_code)]

pub mod json_file;
pub mod repo;
pub mod salt_store;

pub use json_file::JsonFileSaltStore;
pub use repo::SaltStore;
pub use salt_store::{MemSaltStore, StorageError};
