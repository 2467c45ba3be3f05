//! Runtime configuration.
//!
//! Each setting resolves from, in order: command-line flag, environment
//! variable, `state.json` (active project only), built-in default.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::state::StateManager;
use crate::vcs::DEFAULT_GIT_PROGRAM;

pub const HOME_ENV: &str = "GIT_BRIDGE_HOME";
pub const PROJECT_ENV: &str = "GIT_BRIDGE_PROJECT";
pub const GIT_ENV: &str = "GIT_BRIDGE_GIT";
pub const KNOWN_HOSTS_ENV: &str = "GIT_BRIDGE_KNOWN_HOSTS";

/// Directory created under the user's home when no override is given.
pub const DEFAULT_BASE_DIR: &str = ".git-bridge";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Holds the association file, `state.json` and every working copy.
    pub base_dir: PathBuf,
    /// Logical project whose repository is active.
    pub project: Option<String>,
    /// Version-control executable.
    pub git_program: String,
    /// File that SSH host keys are merged into before a first clone.
    pub known_hosts: PathBuf,
}

impl Config {
    pub fn resolve(base_dir: Option<String>, project: Option<String>) -> Result<Self> {
        let home = dirs::home_dir();

        let base_dir = match non_empty(base_dir).or_else(|| env_var(HOME_ENV)) {
            Some(dir) => PathBuf::from(dir),
            None => home
                .clone()
                .ok_or_else(|| BridgeError::State("Could not determine home directory".into()))?
                .join(DEFAULT_BASE_DIR),
        };

        let project = match non_empty(project).or_else(|| env_var(PROJECT_ENV)) {
            Some(project) => Some(project),
            None => StateManager::new(&base_dir)
                .read()
                .ok()
                .and_then(|state| state.current_project),
        };

        let git_program = env_var(GIT_ENV).unwrap_or_else(|| DEFAULT_GIT_PROGRAM.to_string());

        let known_hosts = match env_var(KNOWN_HOSTS_ENV) {
            Some(path) => PathBuf::from(path),
            None => home
                .unwrap_or_else(|| base_dir.clone())
                .join(".ssh")
                .join("known_hosts"),
        };

        let config = Self {
            base_dir,
            project,
            git_program,
            known_hosts,
        };
        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Configuration rooted at `base_dir`, ignoring the environment.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            known_hosts: base_dir.join("known_hosts"),
            base_dir,
            project: None,
            git_program: DEFAULT_GIT_PROGRAM.to_string(),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    non_empty(std::env::var(key).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use tempfile::tempdir;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    /// Clears the bridge environment variables and restores them on drop.
    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            let saved = [HOME_ENV, PROJECT_ENV, GIT_ENV, KNOWN_HOSTS_ENV]
                .into_iter()
                .map(|key| (key, std::env::var(key).ok()))
                .collect();
            for key in [HOME_ENV, PROJECT_ENV, GIT_ENV, KNOWN_HOSTS_ENV] {
                std::env::remove_var(key);
            }
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                match value {
                    Some(v) => std::env::set_var(key, v),
                    None => std::env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_flags_win_over_environment() {
        let _lock = env_lock().lock().unwrap();
        let _guard = EnvGuard::new();
        let tmp = tempdir().unwrap();
        std::env::set_var(HOME_ENV, "/nonexistent/env-home");
        std::env::set_var(PROJECT_ENV, "env-project");

        let config = Config::resolve(
            Some(tmp.path().to_string_lossy().to_string()),
            Some("flag-project".to_string()),
        )
        .unwrap();

        assert_eq!(config.base_dir, tmp.path());
        assert_eq!(config.project.as_deref(), Some("flag-project"));
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let _lock = env_lock().lock().unwrap();
        let _guard = EnvGuard::new();
        let tmp = tempdir().unwrap();
        std::env::set_var(HOME_ENV, tmp.path());
        std::env::set_var(GIT_ENV, "/opt/git/bin/git");
        std::env::set_var(KNOWN_HOSTS_ENV, "/tmp/known_hosts");

        let config = Config::resolve(None, None).unwrap();

        assert_eq!(config.base_dir, tmp.path());
        assert_eq!(config.git_program, "/opt/git/bin/git");
        assert_eq!(config.known_hosts, PathBuf::from("/tmp/known_hosts"));
        assert_eq!(config.project, None);
    }

    #[test]
    fn test_project_falls_back_to_state_file() {
        let _lock = env_lock().lock().unwrap();
        let _guard = EnvGuard::new();
        let tmp = tempdir().unwrap();
        StateManager::new(tmp.path())
            .set_current_project("from-state")
            .unwrap();

        let config = Config::resolve(Some(tmp.path().to_string_lossy().to_string()), None).unwrap();

        assert_eq!(config.project.as_deref(), Some("from-state"));
        assert_eq!(config.git_program, DEFAULT_GIT_PROGRAM);
    }
}
