//! Key derivation using PBKDF2-HMAC-SHA256.
//!
//! The iteration count is deliberately high to slow down offline brute force
//! against short PINs.

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::keys::{MasterKey, Salt, KEY_LENGTH};
use jamtalk_common::{Error, Result};

/// Production iteration count.
pub const KDF_ITERATIONS: u32 = 600_000;

/// Parameters for PBKDF2 key derivation.
///
/// Fixed for the lifetime of a storage instance; changing them for an existing
/// vault makes every encrypted record undecryptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Number of HMAC-SHA256 iterations.
    pub iterations: u32,
}

impl KdfParams {
    /// Production parameters (600,000 iterations).
    pub fn standard() -> Self {
        Self {
            iterations: KDF_ITERATIONS,
        }
    }

    /// Cheap parameters for unit tests. Never use for real vaults.
    pub fn testing() -> Self {
        Self { iterations: 1_000 }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::standard()
    }
}

/// Derive a master key from a password and salt.
///
/// # Postconditions
/// - The derived key is deterministic given the same inputs
/// - Any password, including an empty one, yields some key; a wrong password
///   is only detected when a decrypt fails authentication
///
/// # Errors
/// - `InvalidInput` if the salt is empty or the iteration count is zero
///
/// # Security
/// - Password is not stored or logged
pub fn derive_key(password: &[u8], salt: &Salt, params: &KdfParams) -> Result<MasterKey> {
    if salt.as_bytes().is_empty() {
        return Err(Error::InvalidInput("Salt cannot be empty".to_string()));
    }
    if params.iterations == 0 {
        return Err(Error::InvalidInput(
            "KDF iteration count must be positive".to_string(),
        ));
    }

    let mut key_bytes = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password, salt.as_bytes(), params.iterations, &mut key_bytes);

    Ok(MasterKey::from_bytes(key_bytes))
}
