//! Registry documents.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::ProtocolError;

/// Length of a SHA-256 digest in bytes.
pub const SHA256_LEN: usize = 32;

/// Immutable release record, stored at `{name}-{version}-{os}-{arch}.json`.
///
/// The digest is serialized as standard base64, so the document reads
/// `{"Sha256":"<base64>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    #[serde(rename = "Sha256", with = "base64_bytes")]
    sha256: Vec<u8>,
}

impl ReleaseRecord {
    /// Wrap a raw SHA-256 digest.
    pub fn new(sha256: Vec<u8>) -> Result<Self, ProtocolError> {
        if sha256.len() != SHA256_LEN {
            return Err(ProtocolError::DigestLength {
                expected: SHA256_LEN,
                actual: sha256.len(),
            });
        }
        Ok(Self { sha256 })
    }

    /// Digest `bytes` and build the record.
    pub fn for_bytes(bytes: &[u8]) -> Self {
        Self {
            sha256: Sha256::digest(bytes).to_vec(),
        }
    }

    pub fn sha256(&self) -> &[u8] {
        &self.sha256
    }

    pub fn sha256_hex(&self) -> String {
        hex::encode(&self.sha256)
    }

    /// Returns true if `bytes` hash to this record's digest.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        Sha256::digest(bytes).as_slice() == self.sha256.as_slice()
    }
}

/// Mutable pointer to the current version, stored at `{name}-{os}-{arch}.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentVersionPointer {
    #[serde(rename = "Version")]
    pub version: String,
}

impl CurrentVersionPointer {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_record_wire_format() {
        let record = ReleaseRecord::new(vec![0u8; SHA256_LEN]).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"Sha256":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="}"#);
    }

    #[test]
    fn test_release_record_parse() {
        let record = ReleaseRecord::for_bytes(b"hello");
        let json = serde_json::to_string(&record).unwrap();
        let parsed: ReleaseRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
        assert!(parsed.matches(b"hello"));
        assert!(!parsed.matches(b"hello!"));
        assert_eq!(
            parsed.sha256_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_release_record_rejects_short_digest() {
        let err = ReleaseRecord::new(vec![1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::DigestLength {
                expected: 32,
                actual: 3
            }
        );
    }

    #[test]
    fn test_pointer_wire_format() {
        let pointer = CurrentVersionPointer::new("1.2.3");
        assert_eq!(
            serde_json::to_string(&pointer).unwrap(),
            r#"{"Version":"1.2.3"}"#
        );
    }
}
