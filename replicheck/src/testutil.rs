//! In-memory transport fake for exercising the remote path without SSH
//!
//! Answers the same `find` and `sha256sum` invocations the remote executor
//! and remote discovery issue, against a scripted file tree. Hashes are
//! computed for real so local/remote parity assertions are honest.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{CheckError, Result};
use crate::transport::{CommandOutput, Transport};

#[derive(Default)]
struct MockState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    fail_under: BTreeSet<String>,
    fail_hashing_under: BTreeSet<String>,
    broken: bool,
}

/// Scripted remote host backed by an in-memory tree
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directory (ancestors included)
    pub fn add_dir(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        insert_with_ancestors(&mut state.dirs, path);
    }

    /// Register a file with its content (ancestor directories included)
    pub fn add_file(&self, path: &str, content: &[u8]) {
        let mut state = self.state.lock().unwrap();
        for (i, _) in path.match_indices('/') {
            if i > 0 {
                state.dirs.insert(path[..i].to_string());
            }
        }
        state.files.insert(path.to_string(), content.to_vec());
    }

    /// Overwrite an existing file's content
    pub fn set_file(&self, path: &str, content: &[u8]) {
        self.add_file(path, content);
    }

    /// Remove a directory and everything beneath it
    pub fn remove_dir(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        state.dirs.retain(|d| !is_under(d, path));
        state.files.retain(|f, _| !is_under(f, path));
    }

    /// Make every command touching `path` (or anything under it) fail
    pub fn fail_under(&self, path: &str) {
        self.state.lock().unwrap().fail_under.insert(path.to_string());
    }

    /// Make only `sha256sum` fail for files under `path`
    pub fn fail_hashing_under(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_hashing_under
            .insert(path.to_string());
    }

    /// Simulate a dead session: every subsequent command errors
    pub fn break_session(&self) {
        self.state.lock().unwrap().broken = true;
    }
}

fn insert_with_ancestors(dirs: &mut BTreeSet<String>, path: &str) {
    for (i, _) in path.match_indices('/') {
        if i > 0 {
            dirs.insert(path[..i].to_string());
        }
    }
    dirs.insert(path.to_string());
}

fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix || path.strip_prefix(prefix).is_some_and(|r| r.starts_with('/'))
}

fn output(exit_code: i32, stdout: Vec<u8>, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout,
        stderr: stderr.to_string(),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let state = self.state.lock().unwrap();
        if state.broken {
            return Err(CheckError::transport_error("session disconnected"));
        }

        match program {
            "find" => {
                let root = args.first().cloned().unwrap_or_default();
                if state.fail_under.iter().any(|f| is_under(&root, f)) {
                    return Ok(output(2, Vec::new(), "find: injected failure"));
                }
                if !state.dirs.contains(&root) {
                    return Ok(output(
                        1,
                        Vec::new(),
                        &format!("find: '{root}': No such file or directory"),
                    ));
                }

                let listing_only = args.iter().any(|a| a == "-maxdepth");
                let mut stdout = Vec::new();
                if listing_only {
                    for dir in &state.dirs {
                        let immediate_child = dir
                            .strip_prefix(&root)
                            .and_then(|r| r.strip_prefix('/'))
                            .is_some_and(|r| !r.is_empty() && !r.contains('/'));
                        if immediate_child {
                            stdout.extend_from_slice(dir.as_bytes());
                            stdout.push(0);
                        }
                    }
                } else {
                    for file in state.files.keys() {
                        if is_under(file, &root) {
                            stdout.extend_from_slice(file.as_bytes());
                            stdout.push(0);
                        }
                    }
                }
                Ok(output(0, stdout, ""))
            }

            "sha256sum" => {
                let paths = match args.first().map(String::as_str) {
                    Some("--") => &args[1..],
                    _ => args,
                };

                let mut stdout = String::new();
                for path in paths {
                    let injected = state
                        .fail_under
                        .iter()
                        .chain(state.fail_hashing_under.iter())
                        .any(|f| is_under(path, f));
                    if injected {
                        return Ok(output(1, Vec::new(), "sha256sum: injected failure"));
                    }

                    let Some(content) = state.files.get(path) else {
                        return Ok(output(
                            1,
                            Vec::new(),
                            &format!("sha256sum: {path}: No such file or directory"),
                        ));
                    };

                    let digest = Sha256::digest(content);
                    stdout.push_str(&format!("{digest:x}  {path}\n"));
                }
                Ok(output(0, stdout.into_bytes(), ""))
            }

            other => Ok(output(127, Vec::new(), &format!("{other}: command not found"))),
        }
    }
}
