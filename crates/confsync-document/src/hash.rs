//! Content hashing for documents
//!
//! Provides [`ContentHash`], a 32-byte Blake3 digest over a document's
//! canonical JSON form. Two documents with the same fields hash equally
//! regardless of key insertion order.

use std::fmt::{self, Display, Formatter};

/// A 32-byte content hash (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute Blake3 hash of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_display_is_full_hex() {
        let hash = ContentHash::compute(b"confsync");
        let text = hash.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text, hex::encode(hash.as_bytes()));
        assert!(text.starts_with(&hash.short()));
    }

    #[test]
    fn hash_short_is_sixteen_chars() {
        assert_eq!(ContentHash::compute(b"x").short().len(), 16);
    }

    #[test]
    fn hash_serializes_as_hex_string() {
        let hash = ContentHash::compute(b"abc");
        let json = serde_json::to_value(hash).unwrap();
        assert_eq!(json, serde_json::Value::String(hash.to_string()));
    }

    #[test]
    fn equal_content_hashes_equal() {
        assert_eq!(ContentHash::compute(b"abc"), ContentHash::compute(b"abc"));
        assert_ne!(ContentHash::compute(b"abc"), ContentHash::compute(b"abd"));
    }
}
