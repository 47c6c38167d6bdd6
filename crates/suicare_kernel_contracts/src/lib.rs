#![forbid(unsafe_code)]

pub mod common;
pub mod salt;
pub mod wire;

pub use common::{ContractViolation, Validate};
pub use salt::{Salt, SaltRecord, SubjectId};
