//! Schema-less structured records.
//!
//! A [`Record`] is a bag of named fields. Each field is a byte scalar, a
//! nested record, or an ordered list of records. The store never validates
//! which fields a kind of record carries; the typed shapes in
//! [`crate::capture`] impose that on top.
//!
//! - `fingerprint` derives the content identity used as directory name
//! - `codec` maps records to and from directory trees

pub mod codec;
mod fingerprint;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeSeq, Serializer};

pub use codec::{read_record, write_record, Entries, Entry, LIST_SENTINEL};
pub use fingerprint::{fingerprint, Fingerprint, HASHED_PREFIX_LEN};

/// Field holding the caller-chosen record kind.
pub const KIND_FIELD: &str = "kind";

/// Value of a single record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(Vec<u8>),
    Record(Record),
    List(Vec<Record>),
}

impl FieldValue {
    /// Empty scalars, empty nested records and empty lists are all "empty".
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Scalar(bytes) => bytes.is_empty(),
            FieldValue::Record(record) => record.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Scalar(bytes) => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
            FieldValue::Record(record) => record.serialize(serializer),
            FieldValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// Named bag of fields, kept sorted by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record whose `kind` field is already set.
    pub fn with_kind(kind: &str) -> Self {
        let mut record = Self::new();
        record.set_scalar(KIND_FIELD, kind);
        record
    }

    pub fn set_scalar(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.fields
            .insert(name.into(), FieldValue::Scalar(value.into()));
    }

    pub fn set_record(&mut self, name: impl Into<String>, value: Record) {
        self.fields.insert(name.into(), FieldValue::Record(value));
    }

    pub fn set_list(&mut self, name: impl Into<String>, items: Vec<Record>) {
        self.fields.insert(name.into(), FieldValue::List(items));
    }

    /// Append to a list field, creating it if absent.
    ///
    /// A non-list field of the same name is replaced by a one-element list.
    pub fn push(&mut self, name: &str, item: Record) {
        match self.fields.get_mut(name) {
            Some(FieldValue::List(items)) => items.push(item),
            _ => self.set_list(name, vec![item]),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<&[u8]> {
        match self.fields.get(name) {
            Some(FieldValue::Scalar(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Scalar field decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.scalar(name).map(String::from_utf8_lossy)
    }

    pub fn record(&self, name: &str) -> Option<&Record> {
        match self.fields.get(name) {
            Some(FieldValue::Record(record)) => Some(record),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[Record]> {
        match self.fields.get(name) {
            Some(FieldValue::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<Cow<'_, str>> {
        self.text(KIND_FIELD)
    }

    /// Fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(self)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind().as_deref().unwrap_or("record"))?;
        write!(f, " ({} fields)", self.len())
    }
}

/// Field names become file names, so they must be single safe path
/// components. All-digit names are reserved for list elements.
pub fn validate_field_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(&['/', '\\', '\0'][..])
        && !is_element_name(name)
}

pub(crate) fn is_element_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}
