//! Storage configuration and vault metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::policy::EncryptionPolicy;
use jamtalk_common::{Bucket, Error, Result};
use jamtalk_crypto::{KdfParams, Salt};

/// Key of the metadata record inside the `vault_meta` bucket.
pub const VAULT_META_KEY: &str = "config";

/// Vault metadata record.
///
/// Its presence is the only signal that a vault has been set up. It is
/// written once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultMeta {
    /// Hex-encoded KDF salt.
    pub salt: String,
    /// Setup time; absent in records written by older clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl VaultMeta {
    /// Metadata for a freshly set-up vault.
    pub fn new(salt: &Salt) -> Self {
        Self {
            salt: salt.to_hex(),
            created_at: Some(Utc::now()),
        }
    }
}

fn default_backend() -> String {
    "sqlite".to_string()
}

fn default_sensitive_buckets() -> Vec<Bucket> {
    vec![Bucket::History, Bucket::Profile]
}

/// Configuration for opening a [`Storage`](crate::Storage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store backend name ("sqlite" or "memory").
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Database file, required by the sqlite backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Buckets encrypted while the vault is unlocked.
    #[serde(default = "default_sensitive_buckets")]
    pub sensitive_buckets: Vec<Bucket>,
    /// Key derivation parameters.
    #[serde(default)]
    pub kdf: KdfParams,
}

impl StorageConfig {
    /// SQLite-backed configuration with default policy and KDF.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: Some(path.into()),
            sensitive_buckets: default_sensitive_buckets(),
            kdf: KdfParams::default(),
        }
    }

    /// In-memory configuration with default policy and KDF.
    pub fn memory() -> Self {
        Self {
            backend: "memory".to_string(),
            path: None,
            sensitive_buckets: default_sensitive_buckets(),
            kdf: KdfParams::default(),
        }
    }

    /// Replace the KDF parameters.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Build the encryption policy.
    pub fn policy(&self) -> Result<EncryptionPolicy> {
        EncryptionPolicy::new(self.sensitive_buckets.iter().copied())
    }

    /// Backend-specific configuration passed to the store registry.
    pub fn backend_config(&self) -> serde_json::Value {
        match &self.path {
            Some(path) => serde_json::json!({ "path": path }),
            None => serde_json::Value::Null,
        }
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::memory()
    }
}
