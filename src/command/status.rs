use anyhow::Result;

use super::GlobalOptions;

pub fn run_status(options: &GlobalOptions) -> Result<()> {
    let bridge = options.open()?;
    let state = bridge.state().read()?;

    match (bridge.project(), bridge.repository_uri()) {
        (Some(project), Some(uri)) => {
            println!("📁 Project: {}", project);
            println!("   Repository: {}", uri);
            match bridge.working_copy() {
                Some(path) => {
                    println!("   Working copy: {}", path.display());
                    println!("   Author: {}", bridge.whoami()?);
                    println!("   Records: {}", bridge.len());
                }
                None => println!("⚠️  The working copy is missing. Re-run 'git-bridge associate'."),
            }
        }
        (Some(project), None) => {
            println!("❌ Project '{}' is not associated with a repository.", project);
        }
        _ => {
            println!("❌ No active project");
            println!("   Run 'git-bridge associate <project> <uri>' to get started.");
        }
    }

    println!("   Last pull: {}", state.last_pull.as_deref().unwrap_or("never"));
    println!("   Last push: {}", state.last_push.as_deref().unwrap_or("never"));

    let others: Vec<_> = bridge
        .binding()
        .iter()
        .filter(|(project, _)| Some(*project) != bridge.project())
        .collect();
    if !others.is_empty() {
        println!("\nOther projects:");
        for (project, uri) in others {
            println!("   {} -> {}", project, uri);
        }
    }

    Ok(())
}
