//! Password-based key derivation with Argon2id.
//!
//! Derives a fixed-length [`PasswordDigest`] from a passphrase and a
//! [`Salt`]. Deterministic for fixed inputs; the salt is stored alongside
//! the protected data and does not need to be secret.

use argon2::{Algorithm, Argon2, Params, Version};

use crate::buffer::SecureBuffer;
use crate::error::{Error, Result};
use crate::value::{PasswordDigest, Salt};

/// Argon2id cost parameters.
#[derive(Debug, Clone)]
pub struct PwhashParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for PwhashParams {
    fn default() -> Self {
        Self { mem_cost_kib: 65536, time_cost: 3, parallelism: 4 }
    }
}

/// Derive a 256-bit key from `passphrase` and `salt`.
///
/// Fails with [`Error::Parameter`] if the cost parameters are outside
/// the range Argon2id accepts.
pub fn derive_key(
    passphrase: &[u8],
    salt: &Salt,
    params: &PwhashParams,
) -> Result<PasswordDigest> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(PasswordDigest::LEN),
    )
    .map_err(|e| Error::Parameter(format!("argon2id: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut out = SecureBuffer::acquire(PasswordDigest::LEN)?;
    let derived = out.with_bytes_mut(|okm| {
        salt.with_bytes(|s| argon2.hash_password_into(passphrase, s, okm))
    });
    derived.map_err(|e| Error::Parameter(format!("argon2id: {e}")))?;

    Ok(PasswordDigest::from_buffer(out))
}
