use anyhow::{Context, Result};

use super::GlobalOptions;
use crate::cli::resolve_dir;
use crate::vcs::VcsSession;

pub fn run_init(options: &GlobalOptions, dir: &str, bare: bool) -> Result<()> {
    let config = options.config()?;
    let path = resolve_dir(dir)?;

    VcsSession::init(&config.git_program, &path, bare)
        .with_context(|| format!("Failed to initialize {}", path.display()))?;

    if bare {
        println!("✅ Created shared repository at {}", path.display());
        println!("   Share it with 'git-bridge associate <project> {}'", path.display());
    } else {
        println!("✅ Initialized repository at {}", path.display());
    }
    Ok(())
}
