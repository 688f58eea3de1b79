//! Pairs local and remote task results and classifies each directory
//!
//! Grouping is side-aware: local results form the directory-name universe,
//! and each name is matched against the remote result of the same name. The
//! output partition is exhaustive and disjoint; no scheduled local directory
//! is ever silently dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CheckError, Result};
use crate::task::{Side, TaskOutcome, TaskResult};

/// Disjoint classification of every local directory that had a task
/// scheduled. Names within each set are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdicts {
    /// Local and remote digests are equal; the local copy is safe to delete
    pub matching: Vec<String>,
    /// Digests differ; the remote copy is incomplete
    pub divergent: Vec<String>,
    /// No remote counterpart was found for this directory
    pub local_only: Vec<String>,
    /// A task for this directory failed; no verdict could be reached
    pub inconclusive: Vec<String>,
}

impl Verdicts {
    /// Total number of classified directories
    pub fn total(&self) -> usize {
        self.matching.len()
            + self.divergent.len()
            + self.local_only.len()
            + self.inconclusive.len()
    }

    /// Whether every directory verified as a complete remote replica
    pub fn fully_replicated(&self) -> bool {
        self.divergent.is_empty()
            && self.local_only.is_empty()
            && self.inconclusive.is_empty()
    }
}

/// Reconcile a flat, unordered result collection into verdicts.
///
/// For each directory name with a local result:
/// - local task failed: `inconclusive`
/// - no remote result: `local_only`
/// - remote task failed: `inconclusive`
/// - digests equal: `matching`, otherwise `divergent`
///
/// More than one result for the same `(side, dirname)` identity is a caller
/// bug and fails fast with [`CheckError::DuplicateTask`].
pub fn reconcile(results: &[TaskResult]) -> Result<Verdicts> {
    let mut locals: BTreeMap<&str, &TaskResult> = BTreeMap::new();
    let mut remotes: BTreeMap<&str, &TaskResult> = BTreeMap::new();

    for result in results {
        let group = match result.side {
            Side::Local => &mut locals,
            Side::Remote => &mut remotes,
        };
        if group.insert(&result.dirname, result).is_some() {
            return Err(CheckError::DuplicateTask {
                side: result.side,
                dirname: result.dirname.clone(),
            });
        }
    }

    let mut verdicts = Verdicts::default();
    for (dirname, local) in &locals {
        let local_digest = match &local.outcome {
            TaskOutcome::Digest(d) => d,
            TaskOutcome::Failed(message) => {
                debug!(dirname = %dirname, message = %message, "local task failed; inconclusive");
                verdicts.inconclusive.push(dirname.to_string());
                continue;
            }
        };

        let Some(remote) = remotes.get(dirname) else {
            verdicts.local_only.push(dirname.to_string());
            continue;
        };

        match &remote.outcome {
            TaskOutcome::Failed(message) => {
                debug!(dirname = %dirname, message = %message, "remote task failed; inconclusive");
                verdicts.inconclusive.push(dirname.to_string());
            }
            TaskOutcome::Digest(remote_digest) if remote_digest == local_digest => {
                verdicts.matching.push(dirname.to_string());
            }
            TaskOutcome::Digest(_) => {
                verdicts.divergent.push(dirname.to_string());
            }
        }
    }

    Ok(verdicts)
}
