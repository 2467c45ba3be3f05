use anyhow::{Context, Result};

use super::GlobalOptions;
use crate::binding::RepositoryBinding;
use crate::state::StateManager;

pub fn run_use(options: &GlobalOptions, project: &str) -> Result<()> {
    let config = options.config()?;
    let binding = RepositoryBinding::load(&config.base_dir)?;

    let Some(uri) = binding.resolve(project) else {
        println!("❌ Project '{}' is not associated with a repository.", project);
        println!("   Run 'git-bridge associate {} <uri>' first.", project);
        return Ok(());
    };

    StateManager::new(&config.base_dir)
        .set_current_project(project)
        .context("Failed to save the current project")?;

    println!("✅ Now using '{}' ({})", project, uri);
    Ok(())
}
