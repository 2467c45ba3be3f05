//! Version-control session over the `git` executable.
//!
//! Every operation runs one subprocess synchronously in the working copy
//! and returns its captured stdout. A non-zero exit becomes a
//! [`VcsCommandError`] carrying the command line, stdout and stderr; nothing
//! is retried and no merge conflict is ever resolved here.
//!
//! Calls block for the lifetime of the subprocess, network round trips of
//! `pull`/`push` included. No timeout is applied.

pub mod known_hosts;

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};

/// Default version-control executable.
pub const DEFAULT_GIT_PROGRAM: &str = "git";

/// A version-control subprocess exited unsuccessfully.
#[derive(Error, Debug, Clone)]
#[error("`{command}` failed ({}): {}", exit_label(.status), .stderr.trim())]
pub struct VcsCommandError {
    pub command: String,
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Scope for `config` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    /// The working copy's own `.git/config`.
    Local,
    /// The user's global configuration.
    Global,
}

/// Name and email recorded on commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Run `program args...` in `cwd`, returning stdout on success.
pub(crate) fn run_command<I, S>(program: &str, args: I, cwd: &Path) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args
        .into_iter()
        .map(|a| a.as_ref().to_os_string())
        .collect();
    let command = render_command(program, &args);
    debug!("Subprocess: {} (in {})", command, cwd.display());

    let output = Command::new(program)
        .args(&args)
        .current_dir(cwd)
        .output()
        .map_err(|source| BridgeError::Spawn {
            command: command.clone(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        warn!("Error on call `{}`: {}", command, stderr.trim());
        return Err(VcsCommandError {
            command,
            status: output.status.code(),
            stdout,
            stderr,
        }
        .into());
    }

    Ok(stdout)
}

fn render_command(program: &str, args: &[std::ffi::OsString]) -> String {
    let mut rendered = program.to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

/// Version-control operations bound to one working copy.
#[derive(Debug, Clone)]
pub struct VcsSession {
    program: String,
    workdir: PathBuf,
}

impl VcsSession {
    pub fn new(program: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn git<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        run_command(&self.program, args, &self.workdir)
    }

    /// Create a new repository at `dir` (bare for a shared remote).
    pub fn init(program: &str, dir: &Path, bare: bool) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| BridgeError::io(dir, e))?;
        let mut args = vec!["init"];
        if bare {
            args.push("--bare");
        }
        run_command(program, &args, dir)?;
        info!("Initialized repository at {}", dir.display());
        Ok(Self::new(program, dir))
    }

    /// Clone `uri` into `parent/name` and return a session on the clone.
    pub fn clone_into(program: &str, uri: &str, parent: &Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(parent).map_err(|e| BridgeError::io(parent, e))?;
        run_command(program, ["clone", uri, name], parent)?;
        info!("Cloned {} into {}", uri, parent.join(name).display());
        Ok(Self::new(program, parent.join(name)))
    }

    /// Stage `path` (relative to the working copy), deletions included.
    pub fn add(&self, path: impl AsRef<Path>) -> Result<String> {
        self.git([
            OsStr::new("add"),
            OsStr::new("--all"),
            OsStr::new("--"),
            path.as_ref().as_os_str(),
        ])
    }

    /// Stage everything the tree codec wrote for one record directory.
    pub fn stage(&self, record_dir: impl AsRef<Path>) -> Result<()> {
        self.add(record_dir)?;
        Ok(())
    }

    pub fn has_staged_changes(&self) -> Result<bool> {
        match self.git(["diff", "--cached", "--quiet"]) {
            Ok(_) => Ok(false),
            Err(BridgeError::Vcs(e)) if e.status == Some(1) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Commit staged changes. An empty index is a successful no-op.
    pub fn commit(&self, message: &str) -> Result<String> {
        if !self.has_staged_changes()? {
            debug!("Nothing staged; skipping commit {:?}", message);
            return Ok(String::new());
        }
        self.git(["commit", "-m", message])
    }

    /// Whether `origin` has any branch yet. A freshly initialized remote
    /// has none until the first push.
    pub fn remote_has_heads(&self) -> Result<bool> {
        let heads = self.git(["ls-remote", "--heads", "origin"])?;
        Ok(!heads.trim().is_empty())
    }

    /// Merge `origin`'s branch in. Skipped while the remote is still empty.
    pub fn pull(&self) -> Result<String> {
        if !self.remote_has_heads()? {
            debug!("Remote has no branches yet; skipping pull");
            return Ok(String::new());
        }
        self.git(["pull", "--no-rebase", "--no-edit"])
    }

    pub fn push(&self) -> Result<String> {
        self.git(["push", "origin", "HEAD"])
    }

    /// Pick up remote changes before the in-memory view is rebuilt.
    pub fn sync_in(&self) -> Result<String> {
        self.pull()
    }

    /// Pull then push; a rejected push is returned unresolved.
    pub fn sync_out(&self) -> Result<String> {
        let pulled = self.pull()?;
        let pushed = self.push()?;
        Ok(format!("{}{}", pulled, pushed))
    }

    /// Remove `path` from the index and the working tree.
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<String> {
        self.git([
            OsStr::new("rm"),
            OsStr::new("-rf"),
            OsStr::new("--"),
            path.as_ref().as_os_str(),
        ])
    }

    /// Read a config value; an unset key is `None`.
    pub fn config_get(&self, key: &str) -> Result<Option<String>> {
        match self.git(["config", key]) {
            Ok(value) => Ok(Some(value.trim_end_matches(&['\n', '\r'][..]).to_string())),
            Err(BridgeError::Vcs(e)) if e.status == Some(1) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn config_set(&self, scope: ConfigScope, key: &str, value: &str) -> Result<()> {
        let mut args = vec!["config"];
        if scope == ConfigScope::Global {
            args.push("--global");
        }
        args.extend([key, value]);
        self.git(&args)?;
        Ok(())
    }

    pub fn set_identity(&self, identity: &Identity, scope: ConfigScope) -> Result<()> {
        self.config_set(scope, "user.name", &identity.name)?;
        self.config_set(scope, "user.email", &identity.email)?;
        info!("Configured commit identity {}", identity);
        Ok(())
    }

    /// The configured `user.name`, trimmed.
    pub fn whoami(&self) -> Result<String> {
        Ok(self
            .config_get("user.name")?
            .map(|name| name.trim().to_string())
            .unwrap_or_default())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_error_carries_output() {
        let tmp = TempDir::new().unwrap();
        if !git_available() {
            return;
        }
        let session = VcsSession::new(DEFAULT_GIT_PROGRAM, tmp.path());

        let err = session.git(["rev-parse", "--verify", "HEAD"]).unwrap_err();
        match err {
            BridgeError::Vcs(e) => {
                assert!(e.command.starts_with("git rev-parse"));
                assert!(e.status.is_some());
                assert!(!e.stderr.is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let session = VcsSession::new("definitely-not-a-vcs-binary", tmp.path());
        assert!(matches!(
            session.pull().unwrap_err(),
            BridgeError::Spawn { .. }
        ));
    }

    #[test]
    fn test_commit_with_nothing_staged_succeeds() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let session = VcsSession::init(DEFAULT_GIT_PROGRAM, tmp.path(), false).unwrap();
        session
            .set_identity(&identity("Alice"), ConfigScope::Local)
            .unwrap();

        assert_eq!(session.commit("nothing").unwrap(), "");

        std::fs::write(tmp.path().join("note"), "hi").unwrap();
        session.stage("note").unwrap();
        assert!(session.has_staged_changes().unwrap());
        session.commit("Add note").unwrap();

        assert!(!session.has_staged_changes().unwrap());
        assert_eq!(session.commit("again").unwrap(), "");
    }

    #[test]
    fn test_config_get_and_whoami() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let session = VcsSession::init(DEFAULT_GIT_PROGRAM, tmp.path(), false).unwrap();

        assert_eq!(session.config_get("bridge.unset-key").unwrap(), None);

        session
            .set_identity(&identity("Alice"), ConfigScope::Local)
            .unwrap();
        assert_eq!(session.whoami().unwrap(), "Alice");
        assert_eq!(
            session.config_get("user.email").unwrap().as_deref(),
            Some("alice@example.com")
        );
    }

    #[test]
    fn test_remove_then_commit() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let session = VcsSession::init(DEFAULT_GIT_PROGRAM, tmp.path(), false).unwrap();
        session
            .set_identity(&identity("Alice"), ConfigScope::Local)
            .unwrap();
        let dir = tmp.path().join("entry");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("host"), "example.com").unwrap();
        session.stage("entry").unwrap();
        session.commit("Added entry").unwrap();

        session.remove("entry").unwrap();
        session.commit("Removed entry").unwrap();

        assert!(!dir.exists());
        assert!(!session.has_staged_changes().unwrap());
    }

    #[test]
    fn test_clone_pull_push_round() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote_dir = tmp.path().join("remote.git");
        seeded_remote(&remote_dir, tmp.path());

        let uri = remote_dir.to_string_lossy().to_string();
        let a = VcsSession::clone_into(DEFAULT_GIT_PROGRAM, &uri, tmp.path(), "a").unwrap();
        let b = VcsSession::clone_into(DEFAULT_GIT_PROGRAM, &uri, tmp.path(), "b").unwrap();
        a.set_identity(&identity("Alice"), ConfigScope::Local).unwrap();
        b.set_identity(&identity("Bob"), ConfigScope::Local).unwrap();

        std::fs::write(a.workdir().join("from-a"), "a").unwrap();
        a.stage("from-a").unwrap();
        a.commit("a").unwrap();
        a.sync_out().unwrap();

        b.sync_in().unwrap();
        assert!(b.workdir().join("from-a").exists());
    }

    #[test]
    fn test_first_sync_out_to_empty_remote() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote_dir = tmp.path().join("empty.git");
        VcsSession::init(DEFAULT_GIT_PROGRAM, &remote_dir, true).unwrap();

        let uri = remote_dir.to_string_lossy().to_string();
        let a = VcsSession::clone_into(DEFAULT_GIT_PROGRAM, &uri, tmp.path(), "a").unwrap();
        a.set_identity(&identity("Alice"), ConfigScope::Local).unwrap();
        assert!(!a.remote_has_heads().unwrap());
        assert_eq!(a.sync_in().unwrap(), "");

        std::fs::write(a.workdir().join("first"), "1").unwrap();
        a.stage("first").unwrap();
        a.commit("first").unwrap();
        a.sync_out().unwrap();

        assert!(a.remote_has_heads().unwrap());
    }

    #[test]
    fn test_pull_from_missing_remote_fails() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let session = VcsSession::init(DEFAULT_GIT_PROGRAM, tmp.path(), false).unwrap();
        session
            .git(["remote", "add", "origin", "/nonexistent/remote.git"])
            .unwrap();

        assert!(matches!(session.pull(), Err(BridgeError::Vcs(_))));
    }
}
