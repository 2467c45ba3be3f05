//! Project to repository associations.
//!
//! Associations persist in `repo_path_relations.txt` under the base
//! directory, one `project_name,repository_uri` relation per line. Every
//! change rewrites the whole file. The write is not transactional: a crash
//! between the in-memory upsert and [`RepositoryBinding::save`] loses that
//! association, which the user simply makes again.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};

/// File name of the association file inside the base directory.
pub const ASSOCIATION_FILE: &str = "repo_path_relations.txt";

/// A line of the association file that is not `project,uri`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot parse association at line {line_no}: {line:?}")]
pub struct AssociationParseError {
    pub line_no: usize,
    pub line: String,
}

/// Parse one association line into `(project, uri)`.
pub fn parse_line(
    line_no: usize,
    line: &str,
) -> std::result::Result<(String, String), AssociationParseError> {
    let error = || AssociationParseError {
        line_no,
        line: line.to_string(),
    };
    let (project, uri) = line.split_once(',').ok_or_else(error)?;
    let (project, uri) = (project.trim(), uri.trim());
    if project.is_empty() || uri.is_empty() || uri.contains(',') {
        return Err(error());
    }
    Ok((project.to_string(), uri.to_string()))
}

/// Working-copy directory name for a repository URI: the final path
/// segment with any `.git` suffix removed.
///
/// `git@host:org/repo.git` and `https://host/org/repo` both map to `repo`.
pub fn repository_name(uri: &str) -> Result<String> {
    let trimmed = uri.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(|c| c == '/' || c == ':' || c == '\\')
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() || name == "." || name == ".." {
        return Err(BridgeError::InvalidRepositoryUri(uri.to_string()));
    }
    Ok(name.to_string())
}

/// Check that `project,uri` can be written as one association line.
pub fn validate_association(project: &str, uri: &str) -> Result<()> {
    if project.trim().is_empty() || project.contains(&[',', '\n', '\r'][..]) {
        return Err(BridgeError::InvalidProjectName(project.to_string()));
    }
    if uri.trim().is_empty() || uri.contains(&[',', '\n', '\r'][..]) {
        return Err(BridgeError::InvalidRepositoryUri(uri.to_string()));
    }
    Ok(())
}

/// Persisted mapping of logical project name to repository URI.
#[derive(Debug, Clone)]
pub struct RepositoryBinding {
    path: PathBuf,
    relations: BTreeMap<String, String>,
}

impl RepositoryBinding {
    /// Load the association file under `base_dir`; a missing file is empty.
    ///
    /// Malformed lines are logged and skipped.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(ASSOCIATION_FILE);
        let mut relations = BTreeMap::new();

        match fs::read_to_string(&path) {
            Ok(content) => {
                for (idx, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_line(idx + 1, line) {
                        Ok((project, uri)) => {
                            relations.insert(project, uri);
                        }
                        Err(e) => warn!("{} in {}", e, path.display()),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No association file at {}", path.display());
            }
            Err(e) => return Err(BridgeError::io(&path, e)),
        }

        Ok(Self { path, relations })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resolve(&self, project: &str) -> Option<&str> {
        self.relations.get(project).map(String::as_str)
    }

    /// Upsert `project -> uri` in memory. Call [`save`](Self::save) to persist.
    pub fn upsert(&mut self, project: &str, uri: &str) -> Result<Option<String>> {
        validate_association(project, uri)?;
        Ok(self
            .relations
            .insert(project.trim().to_string(), uri.trim().to_string()))
    }

    /// Rewrite the whole association file.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| BridgeError::io(parent, e))?;
        }
        let body = self
            .relations
            .iter()
            .map(|(project, uri)| format!("{},{}", project, uri))
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(&self.path, body).map_err(|e| BridgeError::io(&self.path, e))?;
        info!(
            "Saved {} association(s) to {}",
            self.relations.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Upsert and persist in one step.
    pub fn associate(&mut self, project: &str, uri: &str) -> Result<()> {
        self.upsert(project, uri)?;
        self.save()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.relations
            .iter()
            .map(|(project, uri)| (project.as_str(), uri.as_str()))
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}
