use anyhow::{Context, Result};

use super::GlobalOptions;
use crate::vcs::{ConfigScope, Identity};

pub fn run_associate(
    options: &GlobalOptions,
    project: &str,
    uri: &str,
    name: Option<String>,
    email: Option<String>,
    global: bool,
) -> Result<()> {
    let identity = match (name, email) {
        (Some(name), Some(email)) => Some(Identity { name, email }),
        (None, None) => None,
        _ => anyhow::bail!("--name and --email must be given together"),
    };
    let scope = if global {
        ConfigScope::Global
    } else {
        ConfigScope::Local
    };

    let mut bridge = options.open()?;
    println!("🔗 Associating '{}' with {}...", project, uri);

    bridge
        .associate(project, uri, identity.as_ref().map(|i| (i, scope)))
        .with_context(|| format!("Failed to associate '{}' with {}", project, uri))?;

    if let Some(path) = bridge.working_copy() {
        println!("✅ Working copy ready at {}", path.display());
    }
    if let Some(identity) = &identity {
        println!("   Committing as {}", identity);
    }
    println!("   {} record(s) loaded.", bridge.len());

    Ok(())
}
