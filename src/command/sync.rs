use anyhow::{Context, Result};

use super::GlobalOptions;

pub fn run_pull(options: &GlobalOptions) -> Result<()> {
    let bridge = options.open_active()?;
    println!("⬇️  Pulling from {}...", bridge.repository_uri().unwrap_or("origin"));

    let count = bridge.sync_in().context("Pull failed")?;

    println!("✅ {} record(s) loaded.", count);
    Ok(())
}

pub fn run_push(options: &GlobalOptions) -> Result<()> {
    let bridge = options.open_active()?;
    println!("⬆️  Pushing to {}...", bridge.repository_uri().unwrap_or("origin"));

    bridge
        .sync_out()
        .context("Push failed. Resolve the conflict in the working copy and try again")?;

    println!("✅ Local records shared.");
    Ok(())
}
