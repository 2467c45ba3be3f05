//! SSH host-key bootstrap before the first clone.
//!
//! Cloning over SSH from a host that is not yet in `known_hosts` would stop
//! at an interactive prompt, so the remote's keys are scanned with
//! `ssh-keyscan` and merged into the file first.

use std::fs;
use std::path::Path;

use tracing::{debug, info};
use url::Url;

use super::run_command;
use crate::error::{BridgeError, Result};

pub const KEYSCAN_PROGRAM: &str = "ssh-keyscan";

/// Host to scan for an SSH-style repository URI.
///
/// Handles `ssh://[user@]host[:port]/path` and scp-like `[user@]host:path`.
/// Local paths and other schemes yield `None`.
pub fn ssh_host(uri: &str) -> Option<String> {
    if let Ok(url) = Url::parse(uri) {
        if url.scheme() == "ssh" || url.scheme() == "git+ssh" {
            return url.host_str().map(str::to_string);
        }
        // `host:path` without a user parses as a URL with scheme `host`;
        // anything with `://` is a real scheme we do not scan.
        if uri.contains("://") {
            return None;
        }
    }

    let (authority, _path) = uri.split_once(':')?;
    if authority.is_empty() || authority.contains('/') {
        return None;
    }
    // Single letters are Windows drive prefixes, not hosts.
    if authority.len() == 1 && !authority.contains('@') {
        return None;
    }
    let host = authority.rsplit('@').next().unwrap_or(authority);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Merge `scanned` key lines into `existing`, skipping duplicates.
///
/// Returns the merged file body and the number of lines added.
pub fn merge_keys(existing: &str, scanned: &str) -> (String, usize) {
    let mut lines: Vec<&str> = existing.lines().collect();
    let mut added = 0;

    for key in scanned.lines() {
        let key = key.trim_end();
        if key.is_empty() || key.starts_with('#') || lines.contains(&key) {
            continue;
        }
        lines.push(key);
        added += 1;
    }

    let mut merged = lines.join("\n");
    if !merged.is_empty() {
        merged.push('\n');
    }
    (merged, added)
}

/// Scan `host` and append unseen keys to `known_hosts`.
pub fn ensure_host_keys(host: &str, known_hosts: &Path) -> Result<usize> {
    let cwd = known_hosts.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(cwd).map_err(|e| BridgeError::io(cwd, e))?;

    let scanned = run_command(KEYSCAN_PROGRAM, [host], cwd)?;

    let existing = match fs::read_to_string(known_hosts) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(BridgeError::io(known_hosts, e)),
    };

    let (merged, added) = merge_keys(&existing, &scanned);
    if added == 0 {
        debug!("Host keys for {} already known", host);
        return Ok(0);
    }

    fs::write(known_hosts, merged).map_err(|e| BridgeError::io(known_hosts, e))?;
    info!("Added {} host key(s) for {} to {}", added, host, known_hosts.display());
    Ok(added)
}
