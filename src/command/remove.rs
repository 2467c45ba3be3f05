use anyhow::{Context, Result};

use super::GlobalOptions;

pub fn run_remove(options: &GlobalOptions, prefix: &str) -> Result<()> {
    let bridge = options.open_active()?;
    let fingerprint = bridge.resolve_fingerprint(prefix)?;

    bridge
        .remove(&fingerprint)
        .with_context(|| format!("Failed to remove {}", fingerprint))?;

    println!("🗑️  Removed {}", fingerprint);
    println!("   Run 'git-bridge push' to share the removal.");
    Ok(())
}

pub fn run_describe(options: &GlobalOptions, prefix: &str, text: &str) -> Result<()> {
    let bridge = options.open_active()?;
    let fingerprint = bridge.resolve_fingerprint(prefix)?;

    let updated = bridge
        .set_description(&fingerprint, text)
        .with_context(|| format!("Failed to update the description of {}", fingerprint))?;

    if updated {
        println!("✅ Description of {} updated and pushed.", fingerprint);
    } else {
        println!("❌ Only the author of {} can edit its description.", fingerprint);
    }
    Ok(())
}
