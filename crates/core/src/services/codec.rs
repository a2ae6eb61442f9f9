//! Reversible obfuscation of historical credential values.
//!
//! [`XorHexCodec`] is a single-byte XOR keyed by the owning user id and is
//! trivially breakable by frequency analysis. It only keeps secrets out of
//! plain sight in the audit table; it is not encryption. Replace it through
//! [`ValueCodec`] with an authenticated cipher and a per-user random key if
//! the stored history has to resist someone with database access.

use std::sync::Arc;

use thiserror::Error;

/// Failure to reverse an encoded value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The stored text is not valid hex.
    #[error("encoded value is not valid hex: {0}")]
    InvalidHex(String),

    /// The decoded bytes are not UTF-8.
    #[error("decoded value is not valid UTF-8")]
    InvalidUtf8,

    /// Keys must contain at least one character.
    #[error("codec key must not be empty")]
    EmptyKey,
}

/// Deterministic, symmetric transform applied to sensitive audit values.
pub trait ValueCodec: Send + Sync {
    /// Encode `value` under `key`. Empty or absent input yields `None`.
    fn encrypt(&self, value: Option<&str>, key: &str) -> Result<Option<String>, CodecError>;

    /// Reverse [`ValueCodec::encrypt`]. Empty or absent input yields `None`.
    fn decrypt(&self, value: Option<&str>, key: &str) -> Result<Option<String>, CodecError>;
}

/// Shared codec handle.
pub type SharedCodec = Arc<dyn ValueCodec>;

/// Single-byte XOR over the UTF-8 bytes, rendered as two hex digits per byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct XorHexCodec;

impl XorHexCodec {
    /// Fold the key into one byte: sum of its character codes modulo 255.
    fn derive_key(key: &str) -> Result<u8, CodecError> {
        if key.is_empty() {
            return Err(CodecError::EmptyKey);
        }

        let sum = key
            .chars()
            .fold(0u64, |acc, c| acc.wrapping_add(u64::from(u32::from(c))));
        Ok((sum % 255) as u8)
    }
}

impl ValueCodec for XorHexCodec {
    fn encrypt(&self, value: Option<&str>, key: &str) -> Result<Option<String>, CodecError> {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        let k = Self::derive_key(key)?;

        let bytes: Vec<u8> = value.bytes().map(|b| b ^ k).collect();
        Ok(Some(hex::encode(bytes)))
    }

    fn decrypt(&self, value: Option<&str>, key: &str) -> Result<Option<String>, CodecError> {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        let k = Self::derive_key(key)?;

        let mut bytes = hex::decode(value).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        for b in &mut bytes {
            *b ^= k;
        }

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| CodecError::InvalidUtf8)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key() {
        // 'a' + 'b' = 97 + 98 = 195
        assert_eq!(XorHexCodec::derive_key("ab").unwrap(), 195);
        // 'z' * 3 = 366, 366 % 255 = 111
        assert_eq!(XorHexCodec::derive_key("zzz").unwrap(), 111);
        assert_eq!(XorHexCodec::derive_key(""), Err(CodecError::EmptyKey));
    }

    #[test]
    fn test_encrypt_known_vector() {
        // key "ab" folds to 195 (0xc3); 'A' (0x41) ^ 0xc3 = 0x82
        let encoded = XorHexCodec.encrypt(Some("A"), "ab").unwrap();
        assert_eq!(encoded.as_deref(), Some("82"));
    }

    #[test]
    fn test_round_trip_printable_ascii() {
        let codec = XorHexCodec;
        let all_printable: String = (0x20u8..0x7f).map(char::from).collect();
        let keys = ["u", "01hzx3k9q7m2", "user-with-a-much-longer-identifier", "~~~~"];

        for key in keys {
            for value in ["old123", "new456", "p@ss w0rd!", all_printable.as_str()] {
                let encoded = codec.encrypt(Some(value), key).unwrap();
                let decoded = codec.decrypt(encoded.as_deref(), key).unwrap();
                assert_eq!(decoded.as_deref(), Some(value), "key {key}");
            }
        }
    }

    #[test]
    fn test_round_trip_non_ascii() {
        let codec = XorHexCodec;
        let encoded = codec.encrypt(Some("senha ç ü 🔑"), "user1").unwrap();
        let decoded = codec.decrypt(encoded.as_deref(), "user1").unwrap();
        assert_eq!(decoded.as_deref(), Some("senha ç ü 🔑"));
    }

    #[test]
    fn test_empty_is_no_value() {
        let codec = XorHexCodec;
        assert_eq!(codec.encrypt(Some(""), "user1").unwrap(), None);
        assert_eq!(codec.encrypt(None, "user1").unwrap(), None);
        assert_eq!(codec.decrypt(Some(""), "user1").unwrap(), None);
        assert_eq!(codec.decrypt(None, "user1").unwrap(), None);
    }

    #[test]
    fn test_output_is_two_hex_digits_per_byte() {
        let encoded = XorHexCodec.encrypt(Some("secret"), "user1").unwrap().unwrap();
        assert_eq!(encoded.len(), 12);
        assert!(encoded.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        let result = XorHexCodec.decrypt(Some("zz"), "user1");
        assert!(matches!(result, Err(CodecError::InvalidHex(_))));
    }
}
