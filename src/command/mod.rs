mod add;
mod associate;
mod forget;
mod init;
mod list;
mod remove;
mod status;
mod sync;
mod use_project;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::store::GitBridge;

pub use add::{run_add_capture, run_add_finding};
pub use associate::run_associate;
pub use forget::run_forget;
pub use init::run_init;
pub use list::{run_list, run_show};
pub use remove::{run_describe, run_remove};
pub use status::run_status;
pub use sync::{run_pull, run_push};
pub use use_project::run_use;

/// Options shared by every subcommand.
pub struct GlobalOptions {
    pub home: Option<String>,
    pub project: Option<String>,
}

impl GlobalOptions {
    pub fn config(&self) -> Result<Config> {
        Config::resolve(self.home.clone(), self.project.clone())
            .context("Failed to resolve configuration")
    }

    /// Open the store for the active project.
    pub fn open(&self) -> Result<GitBridge> {
        GitBridge::open(self.config()?).context("Failed to open record store")
    }

    /// Open the store and fail unless a working copy is active.
    pub fn open_active(&self) -> Result<GitBridge> {
        let bridge = self.open()?;
        if bridge.working_copy().is_none() {
            match bridge.project() {
                Some(project) => anyhow::bail!(
                    "Project '{}' has no working copy. Run 'git-bridge associate {} <uri>' first.",
                    project,
                    project
                ),
                None => anyhow::bail!(
                    "No active project. Run 'git-bridge associate <project> <uri>' first."
                ),
            }
        }
        Ok(bridge)
    }
}
