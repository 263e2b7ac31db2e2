//! Authenticated encryption using AES-256-GCM.
//!
//! Each call to [`encrypt`] draws a fresh 96-bit IV from the OS RNG. Reusing
//! an IV under the same key breaks GCM confidentiality, so callers never
//! supply one.

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm,
};

use crate::keys::MasterKey;
use jamtalk_common::{Error, Result};

/// IV size for AES-GCM (12 bytes).
pub const IV_SIZE: usize = 12;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Output of [`encrypt`]: the IV and the ciphertext with its tag appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub iv: [u8; IV_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypt plaintext with AES-256-GCM under a fresh random IV.
///
/// # Postconditions
/// - `ciphertext.len() == plaintext.len() + TAG_SIZE`
/// - Two calls with identical inputs return different IVs and ciphertexts
///
/// # Errors
/// - `Crypto` if the cipher rejects the input
pub fn encrypt(key: &MasterKey, plaintext: &[u8]) -> Result<Sealed> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut iv = [0u8; IV_SIZE];
    iv.copy_from_slice(&nonce);

    let ciphertext = encrypt_with_iv(key, &iv, plaintext)?;
    Ok(Sealed { iv, ciphertext })
}

/// Encrypt with a caller-chosen IV.
///
/// Only reachable from inside the crate so that known-answer tests can pin
/// the IV; production writes go through [`encrypt`].
pub(crate) fn encrypt_with_iv(
    key: &MasterKey,
    iv: &[u8; IV_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));

    cipher
        .encrypt(GenericArray::from_slice(iv), plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))
}

/// Decrypt and verify AES-256-GCM ciphertext.
///
/// # Errors
/// - `AuthenticationFailure` if the tag does not verify (wrong key,
///   corruption, tampering) or the ciphertext is shorter than a tag
pub fn decrypt(key: &MasterKey, iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(Error::AuthenticationFailure);
    }

    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));

    cipher
        .decrypt(GenericArray::from_slice(iv), ciphertext)
        .map_err(|_| Error::AuthenticationFailure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex;
    use crate::keys::KEY_LENGTH;

    fn key(byte: u8) -> MasterKey {
        MasterKey::from_bytes([byte; KEY_LENGTH])
    }

    #[test]
    fn test_known_answer_empty_plaintext() {
        // AES-256-GCM, zero key, zero IV, empty plaintext: output is the tag.
        let ct = encrypt_with_iv(&key(0), &[0u8; IV_SIZE], b"").unwrap();
        assert_eq!(hex::encode(&ct), "530f8afbc74536b9a963b4f1c4cb738b");
    }

    #[test]
    fn test_known_answer_one_block() {
        let ct = encrypt_with_iv(&key(0), &[0u8; IV_SIZE], &[0u8; 16]).unwrap();
        assert_eq!(
            hex::encode(&ct),
            "cea7403d4d606b6e074ec5d3baf39d18d0d1c8a799996bf0265b98b5d48ab919"
        );
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = br#"{"name":"Ann"}"#;

        let sealed = encrypt(&key(42), plaintext).unwrap();
        let decrypted = decrypt(&key(42), &sealed.iv, &sealed.ciphertext).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_ciphertext_size() {
        let plaintext = b"Test message";
        let sealed = encrypt(&key(42), plaintext).unwrap();

        assert_eq!(sealed.ciphertext.len(), plaintext.len() + TAG_SIZE);
    }

    #[test]
    fn test_different_iv_each_time() {
        let plaintext = b"Same plaintext";

        let s1 = encrypt(&key(42), plaintext).unwrap();
        let s2 = encrypt(&key(42), plaintext).unwrap();

        assert_ne!(s1.iv, s2.iv);
        assert_ne!(s1.ciphertext, s2.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let sealed = encrypt(&key(1), b"Secret data").unwrap();
        let result = decrypt(&key(2), &sealed.iv, &sealed.ciphertext);

        assert!(matches!(result, Err(Error::AuthenticationFailure)));
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let mut sealed = encrypt(&key(42), b"Important data").unwrap();
        sealed.ciphertext[3] ^= 0xFF;

        let result = decrypt(&key(42), &sealed.iv, &sealed.ciphertext);
        assert!(matches!(result, Err(Error::AuthenticationFailure)));
    }

    #[test]
    fn test_wrong_iv_fails_authentication() {
        let sealed = encrypt(&key(42), b"Important data").unwrap();
        let mut iv = sealed.iv;
        iv[0] ^= 0x01;

        let result = decrypt(&key(42), &iv, &sealed.ciphertext);
        assert!(matches!(result, Err(Error::AuthenticationFailure)));
    }

    #[test]
    fn test_truncated_ciphertext_fails_authentication() {
        let result = decrypt(&key(42), &[0u8; IV_SIZE], &[0u8; TAG_SIZE - 1]);
        assert!(matches!(result, Err(Error::AuthenticationFailure)));
    }

    #[test]
    fn test_empty_plaintext() {
        let sealed = encrypt(&key(42), b"").unwrap();
        let decrypted = decrypt(&key(42), &sealed.iv, &sealed.ciphertext).unwrap();

        assert!(decrypted.is_empty());
    }
}
