//! Error types shared by the record store, codec and VCS layers.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::vcs::VcsCommandError;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Vcs(#[from] VcsCommandError),

    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed record at {}: {reason}", path.display())]
    CodecRead { path: PathBuf, reason: String },

    #[error("Invalid field name: {0:?}")]
    InvalidFieldName(String),

    #[error("Invalid repository URI: {0:?}")]
    InvalidRepositoryUri(String),

    #[error("Invalid project name: {0:?}")]
    InvalidProjectName(String),

    #[error("No repository is associated with the current project")]
    NoActiveRepository,

    #[error("No record with fingerprint {0}")]
    UnknownRecord(String),

    #[error("State file error: {0}")]
    State(String),
}

impl BridgeError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        BridgeError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn codec(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        BridgeError::CodecRead {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
