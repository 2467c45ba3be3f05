use anyhow::{Context, Result};
use std::io::Read;
use std::path::PathBuf;

/// Read a payload from `path`, or from stdin when `path` is `-`.
pub fn read_payload(path: &str) -> Result<Vec<u8>> {
    if path == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read from stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("Failed to read {}", path))
}

/// Resolve a directory argument against the current directory.
pub fn resolve_dir(dir: &str) -> Result<PathBuf> {
    let path = PathBuf::from(dir);
    if path.is_absolute() {
        return Ok(path);
    }
    let current = std::env::current_dir().context("Failed to get current directory")?;
    Ok(current.join(path))
}
