//! Persisted bridge state.
//!
//! Tracks the project the user last switched to and when the working copy
//! was last synchronized, stored as `state.json` in the base directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};

pub const STATE_FILE: &str = "state.json";

/// Contents of `state.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_project: Option<String>,

    /// RFC 3339 timestamp of the last successful pull
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_pull: Option<String>,

    /// RFC 3339 timestamp of the last successful push
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_push: Option<String>,
}

/// Reads and writes [`BridgeState`].
pub struct StateManager {
    state_path: PathBuf,
}

impl StateManager {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            state_path: base_dir.join(STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.state_path
    }

    pub fn read(&self) -> Result<BridgeState> {
        if !self.state_path.exists() {
            return Ok(BridgeState::default());
        }

        let content = std::fs::read_to_string(&self.state_path)
            .map_err(|e| BridgeError::io(&self.state_path, e))?;

        serde_json::from_str(&content).map_err(|e| {
            BridgeError::State(format!("{}: {}", self.state_path.display(), e))
        })
    }

    pub fn write(&self, state: &BridgeState) -> Result<()> {
        if let Some(parent) = self.state_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BridgeError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| BridgeError::State(e.to_string()))?;

        std::fs::write(&self.state_path, content)
            .map_err(|e| BridgeError::io(&self.state_path, e))?;

        debug!("State saved to {:?}", self.state_path);
        Ok(())
    }

    /// Read-modify-write. A corrupt file is replaced rather than blocking
    /// the update.
    pub fn update(&self, f: impl FnOnce(&mut BridgeState)) -> Result<BridgeState> {
        let mut state = self.read().unwrap_or_else(|e| {
            warn!("Failed to read state, starting fresh: {}", e);
            BridgeState::default()
        });
        f(&mut state);
        self.write(&state)?;
        Ok(state)
    }

    pub fn set_current_project(&self, project: &str) -> Result<()> {
        self.update(|state| state.current_project = Some(project.to_string()))?;
        Ok(())
    }

    pub fn mark_pulled(&self) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.update(|state| state.last_pull = Some(now))?;
        Ok(())
    }

    pub fn mark_pushed(&self) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.update(|state| {
            state.last_pull = Some(now.clone());
            state.last_push = Some(now);
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_missing_state() {
        let tmp = tempdir().unwrap();
        let manager = StateManager::new(tmp.path());
        assert_eq!(manager.read().unwrap(), BridgeState::default());
        assert!(!manager.path().exists());
    }

    #[test]
    fn test_current_project_round_trip() {
        let tmp = tempdir().unwrap();
        let manager = StateManager::new(tmp.path());

        manager.set_current_project("demo").unwrap();

        let state = manager.read().unwrap();
        assert_eq!(state.current_project.as_deref(), Some("demo"));
        let raw = std::fs::read_to_string(manager.path()).unwrap();
        assert!(raw.contains("\"currentProject\": \"demo\""));
    }

    #[test]
    fn test_mark_pushed_sets_both_timestamps() {
        let tmp = tempdir().unwrap();
        let manager = StateManager::new(tmp.path());

        manager.mark_pushed().unwrap();

        let state = manager.read().unwrap();
        assert!(state.last_push.is_some());
        assert_eq!(state.last_pull, state.last_push);
    }

    #[test]
    fn test_corrupt_state_is_replaced_on_update() {
        let tmp = tempdir().unwrap();
        let manager = StateManager::new(tmp.path());
        std::fs::write(manager.path(), "{not json").unwrap();

        assert!(matches!(manager.read(), Err(BridgeError::State(_))));
        manager.set_current_project("demo").unwrap();
        assert_eq!(
            manager.read().unwrap().current_project.as_deref(),
            Some("demo")
        );
    }
}
