//! Candidate run-directory discovery on both sides
//!
//! Discovery yields plain sets of immediate subdirectory names. A failure
//! here is fatal: without a trustworthy listing there is no task universe to
//! schedule over.

use std::collections::BTreeSet;
use std::path::Path;

use globset::Glob;
use tokio::fs;
use tracing::debug;

use crate::error::{CheckError, Result};
use crate::transport::Transport;

/// List immediate subdirectories of `base_dir` whose name matches `pattern`,
/// excluding names in `ignore`.
pub async fn discover_local(
    base_dir: &Path,
    pattern: &str,
    ignore: &BTreeSet<String>,
) -> Result<BTreeSet<String>> {
    let matcher = Glob::new(pattern)?.compile_matcher();

    let mut read_dir = fs::read_dir(base_dir).await.map_err(|e| {
        CheckError::discovery_error(
            base_dir.to_string_lossy(),
            format!("Failed to list local base directory: {e}"),
        )
    })?;

    let mut names = BTreeSet::new();
    while let Some(entry) = read_dir.next_entry().await.map_err(|e| {
        CheckError::discovery_error(
            base_dir.to_string_lossy(),
            format!("Failed to read directory entry: {e}"),
        )
    })? {
        let file_type = entry.file_type().await.map_err(|e| {
            CheckError::discovery_error(
                entry.path().to_string_lossy(),
                format!("Failed to read entry type: {e}"),
            )
        })?;
        if !file_type.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if matcher.is_match(&name) && !ignore.contains(&name) {
            names.insert(name);
        }
    }

    debug!(base_dir = %base_dir.display(), count = names.len(), "local discovery complete");
    Ok(names)
}

/// List immediate subdirectory names of `base_dir` on the remote host.
///
/// Uses `find -mindepth 1 -maxdepth 1 -type d -print0` with structured
/// arguments; a non-zero exit is a fatal discovery error.
pub async fn discover_remote<T: Transport + ?Sized>(
    transport: &T,
    base_dir: &str,
) -> Result<BTreeSet<String>> {
    let args = vec![
        base_dir.to_string(),
        "-mindepth".to_string(),
        "1".to_string(),
        "-maxdepth".to_string(),
        "1".to_string(),
        "-type".to_string(),
        "d".to_string(),
        "-print0".to_string(),
    ];

    let output = transport.run("find", &args).await?;
    if !output.success() {
        return Err(CheckError::discovery_error(
            base_dir,
            format!(
                "Remote listing failed (exit {}): {}",
                output.exit_code,
                output.stderr.trim()
            ),
        ));
    }

    let names = output
        .stdout
        .split(|&b| b == 0)
        .filter(|p| !p.is_empty())
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .filter_map(|p| p.rsplit('/').next().map(str::to_string))
        .collect::<BTreeSet<_>>();

    debug!(base_dir, count = names.len(), "remote discovery complete");
    Ok(names)
}
