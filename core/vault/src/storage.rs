//! Storage facade combining the vault with a key-value store.
//!
//! This is the only entry point the application uses. Callers hand in and get
//! back their own values; envelopes and key material never cross this
//! boundary. A record that cannot be opened (vault locked, wrong PIN,
//! corruption) reads as absent, while store failures propagate.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{StorageConfig, VaultMeta, VAULT_META_KEY};
use crate::policy::EncryptionPolicy;
use crate::session::{Vault, VaultState};
use jamtalk_common::{Bucket, Error, Result};
use jamtalk_crypto::{KdfParams, Salt};
use jamtalk_storage::{create_default_registry, KeyValueStore};

/// Encrypted local storage.
///
/// Constructed explicitly and passed to whoever needs it; [`Storage::close`]
/// is the teardown step.
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
    vault: Vault,
}

impl Storage {
    /// Create a storage facade over an existing store.
    pub fn new(store: Arc<dyn KeyValueStore>, policy: EncryptionPolicy, kdf: KdfParams) -> Self {
        Self {
            store,
            vault: Vault::new(policy, kdf),
        }
    }

    /// Open storage as described by `config`.
    ///
    /// # Errors
    /// - `StoreUnavailable` if the database cannot be opened
    /// - `NotFound` for an unknown backend
    /// - `InvalidInput` for an invalid policy or backend configuration
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let policy = config.policy()?;
        let store = create_default_registry().resolve(&config.backend, config.backend_config())?;
        info!(backend = store.name(), "Storage opened");
        Ok(Self::new(store, policy, config.kdf.clone()))
    }

    /// Write `value` under `(bucket, key)`, overwriting any previous value.
    ///
    /// Encrypted when the bucket is sensitive and the vault is unlocked.
    pub async fn set_item<T: Serialize + ?Sized>(
        &self,
        bucket: Bucket,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let stored = self.vault.seal(bucket, value)?;
        debug!(bucket = %bucket, key, "Writing record");
        self.store.put(bucket, key, stored).await
    }

    /// Read the value under `(bucket, key)`.
    ///
    /// Returns `None` if the record is absent or cannot be opened.
    pub async fn get_item<T: DeserializeOwned>(
        &self,
        bucket: Bucket,
        key: &str,
    ) -> Result<Option<T>> {
        match self.store.get(bucket, key).await? {
            Some(stored) => self.decode(bucket, key, stored),
            None => Ok(None),
        }
    }

    /// Read every value in `bucket`, skipping records that cannot be opened.
    pub async fn get_all<T: DeserializeOwned>(&self, bucket: Bucket) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for stored in self.store.get_all(bucket).await? {
            if let Some(value) = self.decode(bucket, "*", stored)? {
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Delete the record under `(bucket, key)`.
    pub async fn remove_item(&self, bucket: Bucket, key: &str) -> Result<()> {
        debug!(bucket = %bucket, key, "Removing record");
        self.store.delete(bucket, key).await
    }

    /// Delete every record in `bucket`. Idempotent.
    pub async fn clear_store(&self, bucket: Bucket) -> Result<()> {
        self.store.clear(bucket).await
    }

    /// Number of records in `bucket`, readable or not.
    pub async fn count(&self, bucket: Bucket) -> Result<u64> {
        self.store.count(bucket).await
    }

    /// Unlock the vault with a password and the hex salt from the vault
    /// metadata. A wrong password is not detected here.
    pub async fn unlock_vault(&self, password: &str, salt_hex: &str) -> Result<()> {
        self.vault.unlock(password, salt_hex).await
    }

    /// Lock the vault, discarding the master key.
    pub fn lock_vault(&self) {
        self.vault.lock();
    }

    /// Whether the vault is locked.
    pub fn is_locked(&self) -> bool {
        self.vault.is_locked()
    }

    /// Get the vault state.
    pub fn state(&self) -> VaultState {
        self.vault.state()
    }

    /// Decrypt failures swallowed since the last unlock.
    ///
    /// A non-zero count across many records usually means the PIN was wrong
    /// or the vault is corrupted.
    pub fn auth_failures(&self) -> u64 {
        self.vault.auth_failures()
    }

    /// Get the encryption policy.
    pub fn policy(&self) -> &EncryptionPolicy {
        self.vault.policy()
    }

    /// Read the vault metadata record, if a vault has been set up.
    pub async fn vault_meta(&self) -> Result<Option<VaultMeta>> {
        self.get_item(Bucket::VaultMeta, VAULT_META_KEY).await
    }

    /// Whether a vault has been set up in this store.
    pub async fn vault_configured(&self) -> Result<bool> {
        Ok(self.store.get(Bucket::VaultMeta, VAULT_META_KEY).await?.is_some())
    }

    /// Set up a vault: generate a salt, persist the metadata and unlock.
    ///
    /// The metadata is inserted only if absent, so of several concurrent
    /// setups exactly one succeeds and the stored salt is never replaced.
    ///
    /// # Errors
    /// - `AlreadyExists` if a vault is already configured
    pub async fn setup_vault(&self, password: &str) -> Result<()> {
        let already = || Error::AlreadyExists("Vault is already configured".to_string());
        if self.vault_configured().await? {
            return Err(already());
        }

        let meta = VaultMeta::new(&Salt::generate());
        let record = self.vault.seal(Bucket::VaultMeta, serde_json::to_value(&meta)?)?;
        if !self
            .store
            .put_if_absent(Bucket::VaultMeta, VAULT_META_KEY, record)
            .await?
        {
            return Err(already());
        }
        info!("Vault set up");

        self.unlock_vault(password, &meta.salt).await
    }

    /// Unlock using the salt stored in the vault metadata.
    ///
    /// # Errors
    /// - `NotFound` if no vault is configured
    pub async fn unlock_with_stored_salt(&self, password: &str) -> Result<()> {
        let meta = self
            .vault_meta()
            .await?
            .ok_or_else(|| Error::NotFound("Vault is not configured".to_string()))?;
        self.unlock_vault(password, &meta.salt).await
    }

    /// Lock the vault and release the store.
    pub async fn close(&self) -> Result<()> {
        self.vault.lock();
        self.store.close().await
    }

    fn decode<T: DeserializeOwned>(
        &self,
        bucket: Bucket,
        key: &str,
        stored: Value,
    ) -> Result<Option<T>> {
        let value = match self.vault.open(stored) {
            Ok(value) => value,
            Err(Error::VaultLocked) => {
                debug!(bucket = %bucket, key, "Vault locked, record unavailable");
                return Ok(None);
            }
            Err(e) if e.is_record_level() => {
                warn!(bucket = %bucket, key, error = e.kind(), "Record unreadable");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_value(value) {
            Ok(value) => Ok(Some(value)),
            // The error text quotes the decrypted value.
            Err(e) => {
                warn!(
                    bucket = %bucket,
                    key,
                    category = ?e.classify(),
                    "Record has unexpected shape"
                );
                Ok(None)
            }
        }
    }
}
