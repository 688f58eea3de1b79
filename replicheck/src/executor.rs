//! Local and remote task executors
//!
//! Both executors produce digests through [`fingerprint::combine_hashes`],
//! so a byte-identical directory tree yields a byte-identical digest no
//! matter which side hashed it. The remote side only delegates per-file
//! SHA-256 computation to the remote host; enumeration filtering, sorting and
//! the outer hash all run locally.

use std::sync::Arc;

use tracing::debug;

use crate::error::{CheckError, Result};
use crate::fingerprint::{self, ExtensionFilter};
use crate::task::{Side, Task};
use crate::transport::Transport;

/// Number of file paths hashed per remote `sha256sum` invocation
const REMOTE_HASH_CHUNK: usize = 64;

/// Runs a task against the local filesystem
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    filter: ExtensionFilter,
}

impl LocalExecutor {
    /// Create a local executor with the given extension filter
    pub fn new(filter: ExtensionFilter) -> Self {
        Self { filter }
    }

    /// Hash `base_dir/dirname` in-process
    pub async fn run(&self, task: &Task) -> Result<String> {
        let root = task.root();
        debug!(dirname = %task.dirname, root = %root.display(), "hashing local directory");
        fingerprint::fingerprint(&root, &self.filter).await
    }
}

/// Runs a task on the remote host through a [`Transport`]
pub struct RemoteExecutor<T: Transport> {
    transport: Arc<T>,
    filter: ExtensionFilter,
}

impl<T: Transport> Clone for RemoteExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            filter: self.filter.clone(),
        }
    }
}

impl<T: Transport> RemoteExecutor<T> {
    /// Create a remote executor sharing `transport` with its siblings.
    ///
    /// The filter must be the same value the local executor uses; divergent
    /// filters make identical directories look divergent.
    pub fn new(transport: Arc<T>, filter: ExtensionFilter) -> Self {
        Self { transport, filter }
    }

    /// Hash `base_dir/dirname` on the remote host
    pub async fn run(&self, task: &Task) -> Result<String> {
        let root = task.root().to_string_lossy().into_owned();
        debug!(dirname = %task.dirname, root = %root, "hashing remote directory");

        let paths = self.enumerate(task, &root).await?;
        if paths.is_empty() {
            return Ok(fingerprint::combine_hashes(Vec::new()));
        }

        let mut file_hashes = Vec::with_capacity(paths.len());
        for chunk in paths.chunks(REMOTE_HASH_CHUNK) {
            file_hashes.extend(self.hash_chunk(task, chunk).await?);
        }

        Ok(fingerprint::combine_hashes(file_hashes))
    }

    /// List matching files under `root` with `find -print0`.
    ///
    /// The suffix filter is applied on this side of the wire so that both
    /// executors share one filter implementation.
    async fn enumerate(&self, task: &Task, root: &str) -> Result<Vec<String>> {
        let args = vec![
            root.to_string(),
            "-type".to_string(),
            "f".to_string(),
            "-print0".to_string(),
        ];

        let output = self.transport.run("find", &args).await?;
        if !output.success() {
            return Err(CheckError::execution_error(
                Side::Remote,
                &task.dirname,
                format!(
                    "remote enumeration of '{root}' failed (exit {}): {}",
                    output.exit_code,
                    output.stderr.trim()
                ),
            ));
        }

        let paths = output
            .stdout
            .split(|&b| b == 0)
            .filter(|p| !p.is_empty())
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .filter(|p| {
                let name = p.rsplit('/').next().unwrap_or(p);
                self.filter.matches(name)
            })
            .collect();

        Ok(paths)
    }

    /// Hash one chunk of remote files with `sha256sum --`
    async fn hash_chunk(&self, task: &Task, paths: &[String]) -> Result<Vec<String>> {
        let mut args = Vec::with_capacity(paths.len() + 1);
        args.push("--".to_string());
        args.extend_from_slice(paths);

        let output = self.transport.run("sha256sum", &args).await?;
        if !output.success() {
            return Err(CheckError::execution_error(
                Side::Remote,
                &task.dirname,
                format!(
                    "remote hashing failed (exit {}): {}",
                    output.exit_code,
                    output.stderr.trim()
                ),
            ));
        }

        let text = output.stdout_text();
        let mut hashes = Vec::with_capacity(paths.len());
        for line in text.lines().filter(|l| !l.is_empty()) {
            hashes.push(parse_sha256sum_line(task, line)?);
        }

        if hashes.len() != paths.len() {
            return Err(CheckError::execution_error(
                Side::Remote,
                &task.dirname,
                format!(
                    "remote hashing returned {} hashes for {} files",
                    hashes.len(),
                    paths.len()
                ),
            ));
        }

        Ok(hashes)
    }
}

/// Extract the hex digest from one `sha256sum` output line.
///
/// Coreutils prefixes the line with `\` when the file name contains escaped
/// characters; the digest column itself is unaffected beyond that marker.
fn parse_sha256sum_line(task: &Task, line: &str) -> Result<String> {
    let token = line.split_whitespace().next().unwrap_or("");
    let hex = token.strip_prefix('\\').unwrap_or(token);

    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CheckError::execution_error(
            Side::Remote,
            &task.dirname,
            format!("unexpected sha256sum output line: '{line}'"),
        ));
    }

    Ok(hex.to_string())
}
