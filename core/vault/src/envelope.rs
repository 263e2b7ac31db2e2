//! On-disk envelope for records in sensitive buckets.
//!
//! A stored value is either the raw JSON value or an object of the form
//! `{ "_encrypted": true, "iv": <hex>, "content": <hex> }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use jamtalk_common::{Error, Result};
use jamtalk_crypto::{hex, Sealed, IV_SIZE};

/// Field that marks a stored value as an encrypted envelope.
pub const ENCRYPTED_FIELD: &str = "_encrypted";

/// Encrypted record as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    #[serde(rename = "_encrypted")]
    pub encrypted: bool,
    /// Hex of the 12-byte IV.
    pub iv: String,
    /// Hex of ciphertext with the tag appended.
    pub content: String,
}

impl EncryptedEnvelope {
    /// Wrap cipher output for storage.
    pub fn from_sealed(sealed: &Sealed) -> Self {
        Self {
            encrypted: true,
            iv: hex::encode(sealed.iv),
            content: hex::encode(&sealed.ciphertext),
        }
    }

    /// Decode the IV.
    ///
    /// # Errors
    /// - `MalformedHex` if the field is not hex
    /// - `MalformedEnvelope` if it is not exactly `IV_SIZE` bytes
    pub fn iv_bytes(&self) -> Result<[u8; IV_SIZE]> {
        let bytes = hex::decode(&self.iv)?;
        bytes.try_into().map_err(|bytes: Vec<u8>| {
            Error::MalformedEnvelope(format!(
                "IV must be {} bytes, found {}",
                IV_SIZE,
                bytes.len()
            ))
        })
    }

    /// Decode the ciphertext.
    pub fn content_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(&self.content)
    }

    /// JSON form for the key-value store.
    pub fn into_value(self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A stored value, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Plain(Value),
    Encrypted(EncryptedEnvelope),
}

impl Envelope {
    /// Classify a value read from the store.
    ///
    /// # Errors
    /// - `MalformedEnvelope` if the value is tagged as encrypted but its
    ///   `iv` or `content` fields are missing or not strings
    pub fn classify(value: Value) -> Result<Self> {
        if value.get(ENCRYPTED_FIELD) != Some(&Value::Bool(true)) {
            return Ok(Envelope::Plain(value));
        }

        // serde's message quotes the offending field value.
        serde_json::from_value(value)
            .map(Envelope::Encrypted)
            .map_err(|_| {
                Error::MalformedEnvelope("'iv' and 'content' must be strings".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_values_pass_through() {
        for value in [json!({"name": "Ann"}), json!("Kore"), json!([1, 2]), json!(null)] {
            assert_eq!(Envelope::classify(value.clone()).unwrap(), Envelope::Plain(value));
        }
    }

    #[test]
    fn test_false_tag_is_plain() {
        let value = json!({"_encrypted": false, "iv": "00", "content": "00"});
        assert!(matches!(Envelope::classify(value).unwrap(), Envelope::Plain(_)));
    }

    #[test]
    fn test_envelope_wire_format() {
        let sealed = Sealed {
            iv: [0xab; IV_SIZE],
            ciphertext: vec![0x01, 0x02],
        };
        let value = EncryptedEnvelope::from_sealed(&sealed).into_value().unwrap();

        assert_eq!(
            value,
            json!({
                "_encrypted": true,
                "iv": "abababababababababababab",
                "content": "0102",
            })
        );
        assert!(matches!(
            Envelope::classify(value).unwrap(),
            Envelope::Encrypted(_)
        ));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let value = json!({"_encrypted": true, "iv": "abababababababababababab"});
        assert!(matches!(
            Envelope::classify(value),
            Err(Error::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_malformed_message_does_not_quote_fields() {
        let value = json!({"_encrypted": true, "iv": "abababababababababababab", "content": 4242});
        match Envelope::classify(value) {
            Err(Error::MalformedEnvelope(msg)) => assert!(!msg.contains("4242")),
            other => panic!("expected MalformedEnvelope, got {:?}", other),
        }
    }

    #[test]
    fn test_iv_length_checked() {
        let envelope = EncryptedEnvelope {
            encrypted: true,
            iv: "abab".to_string(),
            content: "00".to_string(),
        };
        assert!(matches!(envelope.iv_bytes(), Err(Error::MalformedEnvelope(_))));
    }

    #[test]
    fn test_bad_hex_is_malformed_hex() {
        let envelope = EncryptedEnvelope {
            encrypted: true,
            iv: "zz".to_string(),
            content: "abc".to_string(),
        };
        assert!(matches!(envelope.iv_bytes(), Err(Error::MalformedHex(_))));
        assert!(matches!(envelope.content_bytes(), Err(Error::MalformedHex(_))));
    }
}
