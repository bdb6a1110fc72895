//! Transport encoding for client-side key material
//!
//! Key material travels as strings in persisted key pair records. The
//! [`KeyCodec`] trait is the seam between the key pair store and whatever
//! produced those strings; the store never interprets key bytes itself.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;

use crate::error::{CoreError, Result};

/// Default prefix of an encoded public key
pub const PUBLIC_KEY_PREFIX: &str = "UID2-X-T-";

/// Default prefix of an encoded private key
pub const PRIVATE_KEY_PREFIX: &str = "UID2-Y-T-";

/// Public key bytes (DER encoded)
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyMaterial(Vec<u8>);

/// Private key bytes (DER encoded)
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PrivateKeyMaterial(Vec<u8>);

impl PublicKeyMaterial {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl PrivateKeyMaterial {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKeyMaterial({} bytes)", self.0.len())
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKeyMaterial([redacted])")
    }
}

/// Encodes and decodes key material to and from its string form
pub trait KeyCodec: Send + Sync {
    fn decode_public(&self, encoded: &str) -> Result<PublicKeyMaterial>;

    fn decode_private(&self, encoded: &str) -> Result<PrivateKeyMaterial>;

    fn encode_public(&self, key: &PublicKeyMaterial) -> String;

    fn encode_private(&self, key: &PrivateKeyMaterial) -> String;
}

/// Codec for `<prefix><base64 DER>` strings
#[derive(Debug, Clone)]
pub struct PrefixedBase64Codec {
    public_prefix: String,
    private_prefix: String,
}

impl PrefixedBase64Codec {
    pub fn new(public_prefix: impl Into<String>, private_prefix: impl Into<String>) -> Self {
        Self {
            public_prefix: public_prefix.into(),
            private_prefix: private_prefix.into(),
        }
    }

    fn decode_with_prefix(&self, encoded: &str, prefix: &str, kind: &str) -> Result<Vec<u8>> {
        let body = encoded.strip_prefix(prefix).ok_or_else(|| {
            CoreError::KeyDecode(format!("{} key is missing the '{}' prefix", kind, prefix))
        })?;

        let bytes = STANDARD.decode(body)?;
        if bytes.is_empty() {
            return Err(CoreError::KeyDecode(format!("{} key is empty", kind)));
        }
        Ok(bytes)
    }
}

impl Default for PrefixedBase64Codec {
    fn default() -> Self {
        Self::new(PUBLIC_KEY_PREFIX, PRIVATE_KEY_PREFIX)
    }
}

impl KeyCodec for PrefixedBase64Codec {
    fn decode_public(&self, encoded: &str) -> Result<PublicKeyMaterial> {
        self.decode_with_prefix(encoded, &self.public_prefix, "public")
            .map(PublicKeyMaterial)
    }

    fn decode_private(&self, encoded: &str) -> Result<PrivateKeyMaterial> {
        self.decode_with_prefix(encoded, &self.private_prefix, "private")
            .map(PrivateKeyMaterial)
    }

    fn encode_public(&self, key: &PublicKeyMaterial) -> String {
        format!("{}{}", self.public_prefix, STANDARD.encode(key.as_bytes()))
    }

    fn encode_private(&self, key: &PrivateKeyMaterial) -> String {
        format!("{}{}", self.private_prefix, STANDARD.encode(key.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLIC_DER: &str = "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEhQ9i767j9beaz8sUhxkgrnW38gIUgG07+8+4ubb80NnikzLhVE7ZHd22haNF6iNNu8O7t7h21IizIifRkCC8OQ==";

    #[test]
    fn test_decode_public() {
        let codec = PrefixedBase64Codec::default();
        let key = codec
            .decode_public(&format!("{}{}", PUBLIC_KEY_PREFIX, PUBLIC_DER))
            .unwrap();

        // P-256 SubjectPublicKeyInfo
        assert_eq!(key.as_bytes().len(), 91);
        assert_eq!(key.as_bytes()[0], 0x30);
        assert_eq!(
            codec.encode_public(&key),
            format!("{}{}", PUBLIC_KEY_PREFIX, PUBLIC_DER)
        );
    }

    #[test]
    fn test_wrong_prefix_rejected() {
        let codec = PrefixedBase64Codec::default();
        let result = codec.decode_private(&format!("{}{}", PUBLIC_KEY_PREFIX, PUBLIC_DER));
        assert!(matches!(result, Err(CoreError::KeyDecode(_))));
    }

    #[test]
    fn test_bad_base64_rejected() {
        let codec = PrefixedBase64Codec::default();
        assert!(codec.decode_public("UID2-X-T-not base64!").is_err());
        assert!(codec.decode_public("UID2-X-T-").is_err());
    }

    #[test]
    fn test_private_debug_redacted() {
        let key = PrivateKeyMaterial::new(vec![1, 2, 3]);
        assert_eq!(format!("{:?}", key), "PrivateKeyMaterial([redacted])");
    }
}
