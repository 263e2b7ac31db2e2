//! Cryptographic primitives for the JamTalk vault.
//!
//! This module provides:
//! - Hex encoding for storing binary cipher material in text envelopes
//! - Key derivation using PBKDF2-HMAC-SHA256
//! - Authenticated encryption using AES-256-GCM
//! - Key types with automatic zeroization
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Every encryption draws a fresh random IV

pub mod aead;
pub mod hex;
pub mod kdf;
pub mod keys;

pub use aead::{decrypt, encrypt, Sealed, IV_SIZE, TAG_SIZE};
pub use kdf::{derive_key, KdfParams, KDF_ITERATIONS};
pub use keys::{MasterKey, Salt, KEY_LENGTH, SALT_LENGTH};
