//! Query hashing for deduplication and cache keys.
//!
//! The hash is a deterministic content digest, not a security control:
//! two deliberations over the same query text share a hash regardless
//! of who submitted them.

use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Generate a SHA-256 hex digest of a query for deduplication.
pub fn hash_query(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        // Writing to a String cannot fail
        let _ = write!(out, "{byte:02x}");
    }
    out
}
