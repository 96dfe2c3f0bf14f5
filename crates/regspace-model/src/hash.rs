//! Content hashing for canonical models.
//!
//! The hash covers the serialized model, so two resolution passes over the
//! same document produce the same fingerprint.

use std::io;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Streams serializer output straight into the digest.
struct DigestWriter<'a>(&'a mut Sha256);

impl io::Write for DigestWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// SHA-256 over the compact JSON form of `value`.
///
/// Returns `None` only if `value` cannot be represented as JSON (a map with
/// non-string keys); model types never hit this.
pub fn content_hash<T: Serialize>(value: &T) -> Option<ContentHash> {
    let mut hasher = Sha256::new();
    serde_json::to_writer(DigestWriter(&mut hasher), value).ok()?;
    Some(hasher.finalize().into())
}

/// Lowercase hex form of a content hash.
pub fn hash_hex(hash: &ContentHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn streaming_matches_buffered() {
        let streamed = content_hash(&vec!["CTRL", "STATUS"]).unwrap();
        let buffered: ContentHash = Sha256::digest(br#"["CTRL","STATUS"]"#).into();
        assert_eq!(streamed, buffered);
        assert_ne!(streamed, content_hash(&vec!["STATUS", "CTRL"]).unwrap());
    }

    #[test]
    fn non_string_keys_have_no_hash() {
        let mut map = HashMap::new();
        map.insert((1u8, 2u8), 3u8);
        assert!(content_hash(&map).is_none());
    }

    #[test]
    fn hex_is_64_lowercase_chars() {
        let hex = hash_hex(&content_hash(&0x100u64).unwrap());
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }
}
