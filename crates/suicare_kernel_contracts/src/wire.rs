#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub const SALT_ROUTE: &str = "/auth/salt";
pub const MISSING_SUBJECT_ERROR: &str = "Missing subject ID (sub)";
pub const STORAGE_UNAVAILABLE_ERROR: &str = "Salt storage unavailable";

/// Query string of `GET /auth/salt`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaltQuery {
    pub sub: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaltResponse {
    pub salt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub outcome: String,
    pub reason: Option<String>,
    pub subject_count: Option<u64>,
}
