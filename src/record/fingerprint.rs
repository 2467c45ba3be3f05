//! Content identity for records.
//!
//! The fingerprint is a SHA-256 digest over the record's scalar and nested
//! fields, visited in field-name order. List fields never contribute, so
//! editing a list element keeps the parent's directory name stable.
//!
//! Only the first [`HASHED_PREFIX_LEN`] bytes of each value are hashed.
//! This caps the cost of hashing large HTTP bodies; two records that differ
//! only past that prefix in every field share a fingerprint. That is an
//! accepted precision trade-off, not a correctness guarantee.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{FieldValue, Record};

/// Bytes of each field value fed into the digest.
pub const HASHED_PREFIX_LEN: usize = 2048;

/// Lowercase hex SHA-256 identifying a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a directory name read back from a working copy.
    pub fn from_dir_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` characters, for compact listings.
    pub fn short(&self, len: usize) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(len)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compute the fingerprint of `record`.
///
/// Empty fields are skipped, so an absent field and a blank one hash alike.
/// A nested record is coerced to its own fingerprint.
pub fn fingerprint(record: &Record) -> Fingerprint {
    let mut hasher = Sha256::new();

    for (name, value) in record.fields() {
        if value.is_empty() {
            continue;
        }
        match value {
            FieldValue::Scalar(bytes) => {
                hasher.update(name.as_bytes());
                hasher.update(truncated(bytes));
            }
            FieldValue::Record(nested) => {
                let nested = fingerprint(nested);
                hasher.update(name.as_bytes());
                hasher.update(truncated(nested.as_str().as_bytes()));
            }
            FieldValue::List(_) => {}
        }
    }

    Fingerprint(format!("{:x}", hasher.finalize()))
}

fn truncated(bytes: &[u8]) -> &[u8] {
    &bytes[..bytes.len().min(HASHED_PREFIX_LEN)]
}
