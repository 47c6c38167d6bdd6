#![forbid(unsafe_code)]

use rand::rngs::OsRng;
use rand::RngCore;
use suicare_kernel_contracts::salt::SALT_ENTROPY_BYTES;
use suicare_kernel_contracts::Salt;

pub trait SaltGenerator: Send + Sync {
    fn generate(&self) -> Result<Salt, rand::Error>;
}

/// 128-bit salts straight from the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngSaltGenerator;

impl SaltGenerator for OsRngSaltGenerator {
    fn generate(&self) -> Result<Salt, rand::Error> {
        let mut bytes = [0u8; SALT_ENTROPY_BYTES];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(Salt::from_entropy(bytes))
    }
}
