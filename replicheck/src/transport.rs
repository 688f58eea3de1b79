//! Remote command transport over a multiplexed SSH session
//!
//! The engine never interpolates directory names into shell strings; every
//! remote invocation is built from a program name plus structured arguments,
//! and the transport layer is responsible for safe quoting. The [`Transport`]
//! trait is the seam that lets the scheduler and remote executor run against
//! an in-memory fake in tests.

use std::path::PathBuf;

use async_trait::async_trait;
use openssh::{KnownHosts, SessionBuilder};
use tracing::debug;

use crate::error::{CheckError, Result};

/// Structured status and output of one remote command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code; -1 if the process was killed by a signal
    pub exit_code: i32,
    /// Raw standard output bytes
    pub stdout: Vec<u8>,
    /// Standard error, lossily decoded for diagnostics
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status zero
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Standard output, lossily decoded
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Credential handed to the transport at connect time.
///
/// The underlying `openssh` session drives the system ssh binary, so
/// authentication goes through the SSH agent or an identity file rather than
/// an interactive password.
#[derive(Debug, Clone, Default)]
pub struct Credential {
    /// Remote user name; the ssh configuration default applies when unset
    pub user: Option<String>,
    /// Private key file to authenticate with
    pub identity_file: Option<PathBuf>,
}

/// Command execution channel to the remote host.
///
/// Implementations must be safe for concurrent use from multiple workers;
/// the production SSH session multiplexes commands over one connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run `program` with structured arguments on the remote host.
    ///
    /// A non-zero exit code is a normal [`CommandOutput`], not an `Err`;
    /// `Err` means the session itself is unusable.
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// An authenticated, multiplexed SSH session to the remote host
pub struct SshSession {
    session: openssh::Session,
    host: String,
}

impl SshSession {
    /// Establish a multiplexed session to `host` using `credential`
    pub async fn connect(host: &str, credential: &Credential) -> Result<Self> {
        let mut builder = SessionBuilder::default();
        builder.known_hosts_check(KnownHosts::Add);

        if let Some(user) = &credential.user {
            builder.user(user.clone());
        }
        if let Some(identity_file) = &credential.identity_file {
            builder.keyfile(identity_file);
        }

        let session = builder.connect_mux(host).await.map_err(|e| {
            CheckError::transport_error(format!("Failed to connect to '{host}': {e}"))
        })?;

        debug!(host, "SSH session established");
        Ok(Self {
            session,
            host: host.to_string(),
        })
    }

    /// The host this session is connected to
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Close the session, reporting any teardown failure
    pub async fn close(self) -> Result<()> {
        self.session.close().await.map_err(|e| {
            CheckError::transport_error(format!("Failed to close session: {e}"))
        })
    }
}

#[async_trait]
impl Transport for SshSession {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!(host = %self.host, program, n_args = args.len(), "running remote command");

        let output = self
            .session
            .command(program)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                CheckError::transport_error(format!(
                    "Session to '{}' failed running '{program}': {e}",
                    self.host
                ))
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
