//! Task and result types for scheduled hashing work

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which execution channel a task runs through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Local filesystem and local compute
    Local,
    /// Remote host reachable through an authenticated session
    Remote,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => write!(f, "local"),
            Side::Remote => write!(f, "remote"),
        }
    }
}

/// An immutable unit of hashing work bound to one side and one directory.
///
/// Identity is `(side, dirname)`; at most one task per identity may be
/// scheduled per run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    /// Which executor runs this task
    pub side: Side,
    /// Name of the run directory under `base_dir`
    pub dirname: String,
    /// Base directory the run directory lives in
    pub base_dir: PathBuf,
}

impl Task {
    /// Create a local hashing task
    pub fn local(dirname: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            side: Side::Local,
            dirname: dirname.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Create a remote hashing task
    pub fn remote(dirname: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            side: Side::Remote,
            dirname: dirname.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Full path of the directory this task hashes
    pub fn root(&self) -> PathBuf {
        self.base_dir.join(&self.dirname)
    }
}

/// What a task's execution produced.
///
/// A failed execution is attached to the result slot rather than dropped, so
/// a partially failed run still accounts for every scheduled directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// Hashing completed; the content digest for the directory
    Digest(String),
    /// Hashing failed; the error message
    Failed(String),
}

/// Result of executing one task. Produced exactly once per task; carries no
/// ordering relative to other results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub side: Side,
    pub dirname: String,
    pub outcome: TaskOutcome,
}

impl TaskResult {
    /// The digest, if execution succeeded
    pub fn digest(&self) -> Option<&str> {
        match &self.outcome {
            TaskOutcome::Digest(d) => Some(d),
            TaskOutcome::Failed(_) => None,
        }
    }
}
