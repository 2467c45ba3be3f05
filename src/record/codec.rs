//! Directory-tree encoding of records.
//!
//! Layout of a record directory:
//! - scalar field: a file named after the field holding its raw bytes
//!   (blank values are written as empty files)
//! - nested record: a subdirectory named after the field, same layout
//! - list field: a subdirectory named after the field holding one element
//!   directory per item (`0`, `1`, ...) plus the empty [`LIST_SENTINEL`] file
//!
//! Element directories are ordered numerically when read back, so lists
//! longer than ten items keep their order.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{is_element_name, validate_field_name, FieldValue, Fingerprint, Record};
use crate::error::{BridgeError, Result};

/// Marker file that distinguishes a list directory from a nested record.
pub const LIST_SENTINEL: &str = ".burp-list";

/// Record read back from a working copy, keyed by its directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub fingerprint: Fingerprint,
    pub record: Record,
}

/// Write `record` under `dir`, creating it if needed.
pub fn write_record(record: &Record, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| BridgeError::io(dir, e))?;

    for (name, value) in record.fields() {
        if !validate_field_name(name) {
            return Err(BridgeError::InvalidFieldName(name.to_string()));
        }
        let path = dir.join(name);
        match value {
            FieldValue::Scalar(bytes) => {
                if path.is_dir() {
                    remove_path(&path)?;
                }
                write_file(&path, bytes)?;
            }
            FieldValue::Record(nested) => {
                if path.is_file() {
                    remove_path(&path)?;
                }
                write_record(nested, &path)?;
            }
            FieldValue::List(items) => {
                // Stale elements from a longer previous list must not survive.
                if path.exists() {
                    remove_path(&path)?;
                }
                fs::create_dir_all(&path).map_err(|e| BridgeError::io(&path, e))?;
                write_file(&path.join(LIST_SENTINEL), &[])?;
                for (idx, item) in items.iter().enumerate() {
                    write_record(item, &path.join(idx.to_string()))?;
                }
            }
        }
    }

    Ok(())
}

/// Read the record stored under `dir`.
///
/// Fails on the first malformed entry; bulk loading through [`Entries`]
/// turns that failure into a skipped record.
pub fn read_record(dir: &Path) -> Result<Record> {
    let mut record = Record::new();

    for (name, path) in list_dir(dir)? {
        if name == LIST_SENTINEL {
            return Err(BridgeError::codec(dir, "list directory read as a record"));
        }
        if is_element_name(&name) {
            return Err(BridgeError::codec(
                &path,
                "numbered entry outside a list directory (missing list marker?)",
            ));
        }

        let meta = fs::symlink_metadata(&path).map_err(|e| BridgeError::io(&path, e))?;
        if meta.is_file() {
            let bytes = fs::read(&path).map_err(|e| BridgeError::io(&path, e))?;
            record.set_scalar(name, bytes);
        } else if meta.is_dir() {
            if path.join(LIST_SENTINEL).is_file() {
                record.set_list(name, read_list(&path)?);
            } else {
                record.set_record(name, read_record(&path)?);
            }
        } else {
            debug!("Skipping non-regular entry {}", path.display());
        }
    }

    Ok(record)
}

fn read_list(dir: &Path) -> Result<Vec<Record>> {
    let mut elements = Vec::new();

    for (name, path) in list_dir(dir)? {
        if name == LIST_SENTINEL {
            continue;
        }
        let index: u64 = name
            .parse()
            .ok()
            .filter(|_| is_element_name(&name))
            .ok_or_else(|| BridgeError::codec(&path, "non-numeric entry in list directory"))?;
        if !path.is_dir() {
            return Err(BridgeError::codec(&path, "list element is not a directory"));
        }
        elements.push((index, path));
    }

    elements.sort_by_key(|(index, _)| *index);
    elements
        .iter()
        .map(|(_, path)| read_record(path))
        .collect()
}

/// Immediate children of `dir` as (utf-8 name, path), sorted by name.
fn list_dir(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut children = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| BridgeError::codec(dir, e.to_string()))?;
        let name = entry
            .file_name()
            .to_str()
            .ok_or_else(|| BridgeError::codec(entry.path(), "entry name is not valid UTF-8"))?
            .to_string();
        children.push((name, entry.into_path()));
    }

    Ok(children)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| BridgeError::io(path, e))?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| BridgeError::io(path, e))
}

fn remove_path(path: &Path) -> Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| BridgeError::io(path, e))
}

/// Lazy walk over the record directories at the root of a working copy.
///
/// Hidden directories (`.git`) and plain files are not records. A record
/// directory that fails to parse is logged and skipped so the rest of the
/// store still loads.
pub struct Entries {
    dirs: std::vec::IntoIter<(String, PathBuf)>,
}

impl Entries {
    /// List the record directories under `root`.
    ///
    /// Only `root` itself must be readable. Entries that cannot be read,
    /// whose names are not UTF-8, or that are symlinks are logged and left
    /// out rather than failing the whole load.
    pub fn open(root: &Path) -> Result<Self> {
        fs::read_dir(root).map_err(|e| BridgeError::io(root, e))?;

        let mut dirs = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                    continue;
                }
            };
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping entry with non UTF-8 name: {}", entry.path().display());
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            // `file_type` does not follow links, so a symlinked directory is
            // never read as a record.
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                warn!("Skipping symlink {}", entry.path().display());
                continue;
            }
            if file_type.is_dir() {
                dirs.push((name, entry.into_path()));
            }
        }

        debug!("Found {} record directories in {}", dirs.len(), root.display());
        Ok(Self {
            dirs: dirs.into_iter(),
        })
    }
}

impl Iterator for Entries {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        for (name, path) in self.dirs.by_ref() {
            match read_record(&path) {
                Ok(record) => {
                    return Some(Entry {
                        fingerprint: Fingerprint::from_dir_name(name),
                        record,
                    })
                }
                Err(e) => warn!("Skipping unreadable record: {}", e),
            }
        }
        None
    }
}
