//! Bounded-concurrency task scheduling
//!
//! Tasks fan out across a semaphore-bounded worker pool; local and remote
//! tasks share the same pool, so slow remote round trips never starve local
//! hashing. An individual task failure is captured in its result slot and
//! never aborts sibling tasks.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{CheckError, Result};
use crate::executor::{LocalExecutor, RemoteExecutor};
use crate::task::{Side, Task, TaskOutcome, TaskResult};
use crate::transport::Transport;

/// Dispatches tasks to the executor matching their side, up to a fixed
/// number concurrently. Result collection order is unspecified.
pub struct Scheduler<T: Transport + 'static> {
    local: LocalExecutor,
    remote: RemoteExecutor<T>,
    concurrency: usize,
}

impl<T: Transport + 'static> Scheduler<T> {
    /// Create a scheduler with a worker pool of size `concurrency`.
    ///
    /// `concurrency` must be at least 1.
    pub fn new(
        local: LocalExecutor,
        remote: RemoteExecutor<T>,
        concurrency: usize,
    ) -> Result<Self> {
        if concurrency == 0 {
            return Err(CheckError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            local,
            remote,
            concurrency,
        })
    }

    /// Execute all tasks and collect one result per task.
    ///
    /// Executor failures become [`TaskOutcome::Failed`] in the corresponding
    /// result slot; this method itself does not fail on them. No task is
    /// retried.
    pub async fn execute(&self, tasks: Vec<Task>) -> Vec<TaskResult> {
        debug!(
            n_tasks = tasks.len(),
            concurrency = self.concurrency,
            "dispatching tasks"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for task in tasks {
            let semaphore = Arc::clone(&semaphore);
            let local = self.local.clone();
            let remote = self.remote.clone();

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("Semaphore closed unexpectedly");

                let run = match task.side {
                    Side::Local => local.run(&task).await,
                    Side::Remote => remote.run(&task).await,
                };

                let outcome = match run {
                    Ok(digest) => TaskOutcome::Digest(digest),
                    Err(e) => {
                        warn!(side = %task.side, dirname = %task.dirname, error = %e, "task failed");
                        TaskOutcome::Failed(e.to_string())
                    }
                };

                TaskResult {
                    side: task.side,
                    dirname: task.dirname,
                    outcome,
                }
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "worker task panicked"),
            }
        }

        results
    }
}
