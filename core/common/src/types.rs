//! Common types used throughout the vault crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

/// Fixed namespace of the local key-value database.
///
/// Every bucket exists from schema initialization onwards; the set cannot be
/// extended at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Config,
    Settings,
    History,
    Lessons,
    Profile,
    VaultMeta,
}

impl Bucket {
    /// All buckets, in schema order.
    pub const ALL: [Bucket; 6] = [
        Bucket::Config,
        Bucket::Settings,
        Bucket::History,
        Bucket::Lessons,
        Bucket::Profile,
        Bucket::VaultMeta,
    ];

    /// Stable on-disk name of the bucket.
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Config => "config",
            Bucket::Settings => "settings",
            Bucket::History => "history",
            Bucket::Lessons => "lessons",
            Bucket::Profile => "profile",
            Bucket::VaultMeta => "vault_meta",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Bucket::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown bucket: {}", s)))
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}
