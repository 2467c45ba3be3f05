use std::io::{self, Write};

use anyhow::{Context, Result};

use super::GlobalOptions;

pub fn run_forget(options: &GlobalOptions, uri: &str, yes: bool) -> Result<()> {
    let mut bridge = options.open()?;
    let path = bridge.working_copy_path(uri)?;

    if !path.exists() {
        println!("No local working copy for {}.", uri);
        return Ok(());
    }

    if !yes {
        println!("⚠️  This deletes {}.", path.display());
        println!("Records that were not pushed will be lost.\n");

        print!("Do you want to delete the local working copy? [y/N]: ");
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        let answer = answer.trim().to_lowercase();

        if answer != "y" && answer != "yes" {
            println!("Cancelled. The working copy was kept.");
            return Ok(());
        }
    }

    bridge
        .delete_local_copy(uri)
        .with_context(|| format!("Failed to delete {}", path.display()))?;
    println!("✅ Deleted local working copy {}", path.display());

    Ok(())
}
