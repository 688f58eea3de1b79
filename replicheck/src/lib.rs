//! Replica Verification Engine
//!
//! Reconciles a local directory tree against a remote directory tree to
//! decide, per run directory, whether the remote copy is a byte-complete
//! replica of the local copy:
//! - Order-independent directory content fingerprinting
//! - Local and remote executors producing byte-identical digests
//! - Bounded-concurrency task scheduling with per-task failure capture
//! - Side-aware reconciliation into a verdict partition
//!
//! The tool only verifies and recommends; it never copies or deletes data.

pub mod discovery;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod reconciler;
pub mod scheduler;
pub mod task;
pub mod transport;

// Re-export main types and functions
pub use discovery::{discover_local, discover_remote};
pub use error::{CheckError, Result};
pub use executor::{LocalExecutor, RemoteExecutor};
pub use fingerprint::{fingerprint, ExtensionFilter};
pub use reconciler::{reconcile, Verdicts};
pub use scheduler::Scheduler;
pub use task::{Side, Task, TaskOutcome, TaskResult};
pub use transport::{CommandOutput, Credential, SshSession, Transport};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

/// Options for a verification run
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Local base directory holding the run directories
    pub local_base: PathBuf,
    /// Base directory on the remote host
    pub remote_base: PathBuf,
    /// Glob pattern selecting candidate run-directory names
    pub pattern: String,
    /// Directory names excluded from discovery
    pub ignore: BTreeSet<String>,
    /// Extension filter used by both sides
    pub filter: ExtensionFilter,
    /// Worker pool size
    pub concurrency: usize,
}

impl VerifyOptions {
    /// Options with the default pattern, filter and concurrency
    pub fn new(local_base: impl Into<PathBuf>, remote_base: impl Into<PathBuf>) -> Self {
        Self {
            local_base: local_base.into(),
            remote_base: remote_base.into(),
            pattern: "*".to_string(),
            ignore: BTreeSet::new(),
            filter: ExtensionFilter::default(),
            concurrency: 10,
        }
    }
}

/// Build one local and one remote task per candidate present in both
/// listings. Candidates absent remotely get no tasks; the caller classifies
/// them as local-only directly.
pub fn plan_tasks(
    candidates: &BTreeSet<String>,
    remote_names: &BTreeSet<String>,
    local_base: &Path,
    remote_base: &Path,
) -> Vec<Task> {
    let mut tasks = Vec::new();
    for name in candidates.intersection(remote_names) {
        tasks.push(Task::local(name, local_base));
        tasks.push(Task::remote(name, remote_base));
    }
    tasks
}

/// Run the full verification pipeline: discover candidates on both sides,
/// hash every shared directory concurrently on both sides, and reconcile the
/// results into verdicts.
///
/// Discovery failures are fatal; per-directory hashing failures surface as
/// inconclusive verdicts without affecting sibling directories.
pub async fn verify<T: Transport + 'static>(
    transport: Arc<T>,
    options: &VerifyOptions,
) -> Result<Verdicts> {
    let local_names =
        discovery::discover_local(&options.local_base, &options.pattern, &options.ignore).await?;
    let remote_base = options.remote_base.to_string_lossy();
    let remote_names = discovery::discover_remote(transport.as_ref(), &remote_base).await?;

    let tasks = plan_tasks(
        &local_names,
        &remote_names,
        &options.local_base,
        &options.remote_base,
    );
    let missing: Vec<String> = local_names.difference(&remote_names).cloned().collect();

    info!(
        candidates = local_names.len(),
        shared = tasks.len() / 2,
        missing_remotely = missing.len(),
        "verification planned"
    );

    let scheduler = Scheduler::new(
        LocalExecutor::new(options.filter.clone()),
        RemoteExecutor::new(transport, options.filter.clone()),
        options.concurrency,
    )?;
    let results = scheduler.execute(tasks).await;

    let mut verdicts = reconciler::reconcile(&results)?;
    verdicts.local_only.extend(missing);
    verdicts.local_only.sort_unstable();

    info!(
        matching = verdicts.matching.len(),
        divergent = verdicts.divergent.len(),
        local_only = verdicts.local_only.len(),
        inconclusive = verdicts.inconclusive.len(),
        "verification complete"
    );

    Ok(verdicts)
}

// Test modules
#[cfg(test)]
pub(crate) mod testutil;
