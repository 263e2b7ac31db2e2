//! Hex codec for cipher material stored in text envelopes.

use jamtalk_common::{Error, Result};

/// Encode bytes as lowercase hex, two digits per byte, no separators.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    ::hex::encode(bytes)
}

/// Decode a hex string back into bytes.
///
/// # Errors
/// - `MalformedHex` if the input has odd length or a non-hex digit
pub fn decode(text: &str) -> Result<Vec<u8>> {
    ::hex::decode(text).map_err(|e| Error::MalformedHex(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_lowercase_no_separators() {
        assert_eq!(encode([0x00u8, 0x0f, 0xa1, 0xff]), "000fa1ff");
        assert_eq!(encode(Vec::<u8>::new()), "");
    }

    #[test]
    fn test_decode_accepts_uppercase() {
        assert_eq!(decode("A1B2").unwrap(), vec![0xa1, 0xb2]);
    }

    #[test]
    fn test_decode_odd_length_fails() {
        assert!(matches!(decode("abc"), Err(Error::MalformedHex(_))));
    }

    #[test]
    fn test_decode_invalid_digit_fails() {
        assert!(matches!(decode("zz"), Err(Error::MalformedHex(_))));
    }

    proptest! {
        #[test]
        fn prop_hex_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
        }
    }
}
