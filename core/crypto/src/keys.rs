//! Key types with secure memory handling.
//!
//! The master key zeroizes its memory on drop. Copies made inside the cipher's
//! key schedule are outside our control, so a residual-memory risk remains
//! for as long as the process lives.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::hex;
use jamtalk_common::{Error, Result};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of salts generated for new vaults.
pub const SALT_LENGTH: usize = 16;

/// Master key derived from the user PIN.
///
/// Lives only in process memory; it has no serialization and its `Debug`
/// output is redacted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; KEY_LENGTH],
}

impl MasterKey {
    /// Create a master key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKey([REDACTED])")
    }
}

/// Salt for key derivation.
///
/// Length is decided by whoever set the vault up; 12 and 16 bytes are both
/// found in the wild.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Generate a random salt of `SALT_LENGTH` bytes.
    pub fn generate() -> Self {
        let mut salt = vec![0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        Self(salt)
    }

    /// Create from bytes.
    ///
    /// # Errors
    /// - `InvalidInput` if `bytes` is empty
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::InvalidInput("Salt cannot be empty".to_string()));
        }
        Ok(Self(bytes))
    }

    /// Parse the hex form kept in the vault metadata record.
    pub fn from_hex(text: &str) -> Result<Self> {
        Self::from_bytes(hex::decode(text)?)
    }

    /// Hex form for the vault metadata record.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({} bytes)", self.0.len())
    }
}
