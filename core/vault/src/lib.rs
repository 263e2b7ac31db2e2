//! Vault engine for the JamTalk local store.
//!
//! This module provides:
//! - The locked/unlocked lifecycle around an in-memory master key
//! - A per-bucket selective encryption policy
//! - The on-disk envelope distinguishing plaintext from ciphertext records
//! - The [`Storage`] facade, the only entry point callers use
//!
//! # Architecture
//! The facade sits between the application and a [`KeyValueStore`], sealing
//! sensitive records on write and opening them on read. Records that cannot
//! be opened are reported as absent rather than as errors.
//!
//! [`KeyValueStore`]: jamtalk_storage::KeyValueStore

pub mod config;
pub mod envelope;
pub mod policy;
pub mod session;
pub mod storage;

pub use config::{StorageConfig, VaultMeta, VAULT_META_KEY};
pub use envelope::{EncryptedEnvelope, Envelope, ENCRYPTED_FIELD};
pub use policy::EncryptionPolicy;
pub use session::{Vault, VaultState};
pub use storage::Storage;
