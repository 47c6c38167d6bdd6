#![forbid(unsafe_code)]

pub mod salt_client;
pub mod salt_generator;
pub mod salt_registry;

pub use salt_client::{subject_from_id_token, ClientError, SaltServiceClient};
pub use salt_generator::{OsRngSaltGenerator, SaltGenerator};
pub use salt_registry::{RegistryError, SaltIssue, SaltIssueOutcome, SaltRegistry};
