//! Error types for the replica verification engine

use std::path::PathBuf;

use crate::task::Side;

/// Result type alias for verification operations
pub type Result<T> = std::result::Result<T, CheckError>;

/// Comprehensive error type for verification operations
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory discovery errors (fatal: no tasks are scheduled)
    #[error("Discovery error at '{path}': {message}")]
    Discovery { path: String, message: String },

    /// A single task's hashing failed; recovered at task granularity
    #[error("Execution error for {side} directory '{dirname}': {message}")]
    Execution {
        side: Side,
        dirname: String,
        message: String,
    },

    /// More than one task was scheduled for the same (side, dirname) identity
    #[error("Duplicate {side} task for directory '{dirname}'")]
    DuplicateTask { side: Side, dirname: String },

    /// The remote session is unusable (connect failure, disconnect, auth expiry)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Hash computation errors
    #[error("Hash computation error for '{path}': {message}")]
    Hash { path: PathBuf, message: String },

    /// Discovery pattern errors
    #[error("Pattern error: {0}")]
    Pattern(#[from] globset::Error),

    /// Invalid caller-supplied configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CheckError {
    /// Create a new discovery error
    pub fn discovery_error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Discovery {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new per-task execution error
    pub fn execution_error(
        side: Side,
        dirname: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Execution {
            side,
            dirname: dirname.into(),
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new hash error
    pub fn hash_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Hash {
            path: path.into(),
            message: message.into(),
        }
    }
}
