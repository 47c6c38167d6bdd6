#![forbid(unsafe_code)]

use std::fmt;

use crate::{ContractViolation, Validate};

/// Fresh salts carry 128 bits of entropy.
pub const SALT_ENTROPY_BYTES: usize = 16;

/// `u128::MAX` has 39 decimal digits.
pub const SALT_MAX_DIGITS: usize = 39;

/// Opaque identifier of a federated identity account (the token's `sub` claim).
///
/// Any non-empty string is accepted and stored exactly as supplied: no
/// trimming, no case folding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for SubjectId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "subject",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-subject salt: a decimal rendering of an unsigned 128-bit integer.
///
/// `Debug` is redacted so the value does not leak through logs or panics.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Salt(String);

impl Salt {
    pub fn new(raw: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(raw.into());
        v.validate()?;
        Ok(v)
    }

    pub fn from_u128(value: u128) -> Self {
        Self(value.to_string())
    }

    pub fn from_entropy(bytes: [u8; SALT_ENTROPY_BYTES]) -> Self {
        Self::from_u128(u128::from_be_bytes(bytes))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Validate for Salt {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "salt",
                reason: "must not be empty",
            });
        }
        if self.0.len() > SALT_MAX_DIGITS {
            return Err(ContractViolation::TooLong {
                field: "salt",
                max: SALT_MAX_DIGITS,
                got: self.0.len(),
            });
        }
        if !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ContractViolation::InvalidValue {
                field: "salt",
                reason: "must be a decimal integer",
            });
        }
        if self.0.parse::<u128>().is_err() {
            return Err(ContractViolation::InvalidValue {
                field: "salt",
                reason: "must be < 2^128",
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltRecord {
    pub subject: SubjectId,
    pub salt: Salt,
}

impl SaltRecord {
    pub fn new(subject: SubjectId, salt: Salt) -> Self {
        Self { subject, salt }
    }
}
