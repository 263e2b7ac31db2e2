//! Vault lifecycle management.
//!
//! The vault holds the master key in memory while unlocked and applies the
//! encryption policy to each record crossing the storage boundary. The key is
//! zeroized when the vault is locked or dropped.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::envelope::{EncryptedEnvelope, Envelope};
use crate::policy::EncryptionPolicy;
use jamtalk_common::{Bucket, Error, Result, SensitiveBytes};
use jamtalk_crypto::{aead, derive_key, KdfParams, MasterKey, Salt};

/// State of the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// No master key held; encrypted records are unreadable.
    Locked,
    /// Master key held in memory.
    Unlocked,
}

/// Vault lifecycle manager.
///
/// The master key is the only shared mutable state. `unlock` and `lock` take
/// the write guard; every encrypt or decrypt runs under one read guard, so no
/// operation observes a key change halfway through.
pub struct Vault {
    master_key: RwLock<Option<MasterKey>>,
    policy: EncryptionPolicy,
    kdf_params: KdfParams,
    auth_failures: AtomicU64,
}

impl Vault {
    /// Create a locked vault.
    pub fn new(policy: EncryptionPolicy, kdf_params: KdfParams) -> Self {
        Self {
            master_key: RwLock::new(None),
            policy,
            kdf_params,
            auth_failures: AtomicU64::new(0),
        }
    }

    // A poisoned lock still holds a valid Option<MasterKey>.
    fn key_read(&self) -> RwLockReadGuard<'_, Option<MasterKey>> {
        self.master_key.read().unwrap_or_else(|e| e.into_inner())
    }

    fn key_write(&self) -> RwLockWriteGuard<'_, Option<MasterKey>> {
        self.master_key.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Derive the master key from `password` and the hex salt, and hold it.
    ///
    /// Derivation runs on the blocking pool. A wrong password is not detected
    /// here: it yields a key whose decrypts fail authentication later.
    /// Unlocking an unlocked vault replaces the key.
    ///
    /// # Errors
    /// - `MalformedHex` if `salt_hex` is not valid hex
    /// - `InvalidInput` if the salt is empty
    pub async fn unlock(&self, password: &str, salt_hex: &str) -> Result<()> {
        let salt = Salt::from_hex(salt_hex)?;
        let password = SensitiveBytes::new(password.as_bytes().to_vec());
        let params = self.kdf_params.clone();

        let key = tokio::task::spawn_blocking(move || {
            derive_key(password.as_bytes(), &salt, &params)
        })
        .await
        .map_err(|e| Error::Crypto(format!("Key derivation task failed: {}", e)))??;

        *self.key_write() = Some(key);
        self.auth_failures.store(0, Ordering::Relaxed);
        info!("Vault unlocked");
        Ok(())
    }

    /// Discard the master key.
    pub fn lock(&self) {
        if self.key_write().take().is_some() {
            info!("Vault locked");
        }
    }

    /// Check whether no master key is held.
    pub fn is_locked(&self) -> bool {
        self.key_read().is_none()
    }

    /// Get the current state.
    pub fn state(&self) -> VaultState {
        if self.is_locked() {
            VaultState::Locked
        } else {
            VaultState::Unlocked
        }
    }

    /// Get the encryption policy.
    pub fn policy(&self) -> &EncryptionPolicy {
        &self.policy
    }

    /// Decrypt failures swallowed since the last unlock.
    pub fn auth_failures(&self) -> u64 {
        self.auth_failures.load(Ordering::Relaxed)
    }

    /// Prepare a value for storage in `bucket`.
    ///
    /// Sensitive buckets are encrypted under a fresh IV when unlocked. When
    /// locked, or for other buckets, the value is returned unchanged.
    pub fn seal(&self, bucket: Bucket, value: Value) -> Result<Value> {
        if !self.policy.is_sensitive(bucket) {
            return Ok(value);
        }

        let plaintext = SensitiveBytes::new(serde_json::to_vec(&value)?);
        let sealed = {
            let guard = self.key_read();
            match guard.as_ref() {
                Some(key) => aead::encrypt(key, plaintext.as_bytes())?,
                None => {
                    debug!(bucket = %bucket, "Vault locked, storing record unencrypted");
                    return Ok(value);
                }
            }
        };

        EncryptedEnvelope::from_sealed(&sealed).into_value()
    }

    /// Recover the caller's value from a stored value.
    ///
    /// # Errors
    /// - `VaultLocked` for an encrypted record while locked
    /// - `AuthenticationFailure` if the tag does not verify
    /// - `MalformedEnvelope` / `MalformedHex` for corrupted envelopes
    /// - `Serialization` if the decrypted bytes are not JSON
    pub fn open(&self, stored: Value) -> Result<Value> {
        let envelope = match Envelope::classify(stored)? {
            Envelope::Plain(value) => return Ok(value),
            Envelope::Encrypted(envelope) => envelope,
        };

        let iv = envelope.iv_bytes()?;
        let ciphertext = envelope.content_bytes()?;

        let plaintext = {
            let guard = self.key_read();
            let key = guard.as_ref().ok_or(Error::VaultLocked)?;
            match aead::decrypt(key, &iv, &ciphertext) {
                Ok(bytes) => SensitiveBytes::new(bytes),
                Err(e) => {
                    if matches!(e, Error::AuthenticationFailure) {
                        self.auth_failures.fetch_add(1, Ordering::Relaxed);
                    }
                    return Err(e);
                }
            }
        };

        Ok(serde_json::from_slice(plaintext.as_bytes())?)
    }
}

impl Drop for Vault {
    fn drop(&mut self) {
        self.lock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SALT: &str = "a1b2c3d4e5f60708a1b2c3d4e5f60708";

    fn test_vault() -> Vault {
        Vault::new(EncryptionPolicy::default(), KdfParams::testing())
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let vault = test_vault();
        assert!(vault.is_locked());
        assert_eq!(vault.state(), VaultState::Locked);

        vault.unlock("1234", SALT).await.unwrap();
        assert!(!vault.is_locked());
        assert_eq!(vault.state(), VaultState::Unlocked);

        vault.lock();
        assert!(vault.is_locked());

        // Locking twice is harmless.
        vault.lock();
        assert!(vault.is_locked());
    }

    #[tokio::test]
    async fn test_unlock_malformed_salt() {
        let vault = test_vault();
        assert!(matches!(
            vault.unlock("1234", "not-hex").await,
            Err(Error::MalformedHex(_))
        ));
        assert!(matches!(
            vault.unlock("1234", "").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(vault.is_locked());
    }

    #[tokio::test]
    async fn test_seal_open_sensitive() {
        let vault = test_vault();
        vault.unlock("1234", SALT).await.unwrap();

        let stored = vault.seal(Bucket::Profile, json!({"name": "Ann"})).unwrap();
        assert_eq!(stored["_encrypted"], json!(true));
        assert_eq!(stored["iv"].as_str().unwrap().len(), 24);

        assert_eq!(vault.open(stored).unwrap(), json!({"name": "Ann"}));
    }

    #[tokio::test]
    async fn test_seal_passes_through_non_sensitive() {
        let vault = test_vault();
        vault.unlock("1234", SALT).await.unwrap();

        let stored = vault.seal(Bucket::Settings, json!("Kore")).unwrap();
        assert_eq!(stored, json!("Kore"));
    }

    #[test]
    fn test_seal_while_locked_stores_as_is() {
        let vault = test_vault();
        let stored = vault.seal(Bucket::History, json!({"text": "hola"})).unwrap();
        assert_eq!(stored, json!({"text": "hola"}));
    }

    #[tokio::test]
    async fn test_open_locked_fails_closed() {
        let vault = test_vault();
        vault.unlock("1234", SALT).await.unwrap();
        let stored = vault.seal(Bucket::History, json!({"text": "hola"})).unwrap();
        vault.lock();

        assert!(matches!(vault.open(stored), Err(Error::VaultLocked)));
    }

    #[tokio::test]
    async fn test_wrong_password_counts_failure() {
        let vault = test_vault();
        vault.unlock("1234", SALT).await.unwrap();
        let stored = vault.seal(Bucket::History, json!({"text": "hola"})).unwrap();

        vault.unlock("9999", SALT).await.unwrap();
        assert!(matches!(
            vault.open(stored.clone()),
            Err(Error::AuthenticationFailure)
        ));
        assert!(matches!(vault.open(stored), Err(Error::AuthenticationFailure)));
        assert_eq!(vault.auth_failures(), 2);

        vault.unlock("1234", SALT).await.unwrap();
        assert_eq!(vault.auth_failures(), 0);
    }

    #[tokio::test]
    async fn test_different_salt_different_key() {
        let vault = test_vault();
        vault.unlock("1234", SALT).await.unwrap();
        let stored = vault.seal(Bucket::Profile, json!(1)).unwrap();

        vault
            .unlock("1234", "0000000000000000000000000000000000")
            .await
            .unwrap();
        assert!(matches!(vault.open(stored), Err(Error::AuthenticationFailure)));
    }
}
