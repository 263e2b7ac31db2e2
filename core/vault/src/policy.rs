//! Selective encryption policy.

use std::collections::BTreeSet;

use jamtalk_common::{Bucket, Error, Result};

/// The set of buckets whose records are encrypted while the vault is unlocked.
///
/// All other buckets are stored in plaintext regardless of lock state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionPolicy {
    sensitive: BTreeSet<Bucket>,
}

impl EncryptionPolicy {
    /// Build a policy from a list of sensitive buckets.
    ///
    /// # Errors
    /// - `InvalidInput` if `vault_meta` is listed; the salt has to stay
    ///   readable while the vault is locked
    pub fn new(buckets: impl IntoIterator<Item = Bucket>) -> Result<Self> {
        let sensitive: BTreeSet<Bucket> = buckets.into_iter().collect();
        if sensitive.contains(&Bucket::VaultMeta) {
            return Err(Error::InvalidInput(
                "vault_meta cannot be a sensitive bucket".to_string(),
            ));
        }
        Ok(Self { sensitive })
    }

    /// A policy that never encrypts.
    pub fn none() -> Self {
        Self {
            sensitive: BTreeSet::new(),
        }
    }

    /// Whether records in `bucket` are eligible for encryption.
    pub fn is_sensitive(&self, bucket: Bucket) -> bool {
        self.sensitive.contains(&bucket)
    }

    /// The sensitive buckets, in schema order.
    pub fn sensitive_buckets(&self) -> impl Iterator<Item = Bucket> + '_ {
        self.sensitive.iter().copied()
    }
}

impl Default for EncryptionPolicy {
    /// Conversation history and the user profile.
    fn default() -> Self {
        Self {
            sensitive: [Bucket::History, Bucket::Profile].into_iter().collect(),
        }
    }
}
