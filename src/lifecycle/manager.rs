//! Process-wide shutdown sequencer.
//!
//! # Responsibilities
//! - Hold the shutdown tasks registered by subsystems
//! - Run them once at process termination
//! - Wait for parallel tasks by polling, up to a deadline
//!
//! # Design Decisions
//! - Serial tasks run one after another; each must complete (or the deadline
//!   pass) before the next starts
//! - Parallel tasks are all executed first-come, then awaited together
//! - No task is cancelled; a timed-out task is reported and left running

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::ShutdownConfig;
use crate::lifecycle::task::ShutdownTask;

/// How a shutdown sequence ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every task reported completion.
    Completed,
    /// A task refused to proceed.
    Aborted { task: String },
    /// These tasks had not completed by the deadline.
    TimedOut { pending: Vec<String> },
}

/// Registry and runner for shutdown tasks.
pub struct ShutdownManager {
    tasks: Mutex<Vec<Arc<dyn ShutdownTask>>>,
    poll_interval: Duration,
}

impl ShutdownManager {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            poll_interval,
        }
    }

    pub fn from_config(config: &ShutdownConfig) -> Self {
        Self::new(Duration::from_millis(config.poll_interval_ms))
    }

    /// Register a task. Registering the same task twice has no effect.
    pub fn register(&self, task: Arc<dyn ShutdownTask>) {
        let mut tasks = self.lock();
        if !tasks.iter().any(|t| same_task(t, &task)) {
            tracing::debug!(task = %task.name(), "Shutdown task registered");
            tasks.push(task);
        }
    }

    /// Remove a task. Returns whether it was registered.
    pub fn deregister(&self, task: &Arc<dyn ShutdownTask>) -> bool {
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|t| !same_task(t, task));
        let removed = tasks.len() != before;
        if removed {
            tracing::debug!(task = %task.name(), "Shutdown task deregistered");
        }
        removed
    }

    pub fn is_registered(&self, task: &Arc<dyn ShutdownTask>) -> bool {
        self.lock().iter().any(|t| same_task(t, task))
    }

    pub fn tasks(&self) -> Vec<Arc<dyn ShutdownTask>> {
        self.lock().clone()
    }

    /// Execute every registered task, waiting at most `timeout` overall.
    pub async fn run(&self, timeout: Duration) -> ShutdownOutcome {
        let deadline = Instant::now() + timeout;
        let mut parallel = Vec::new();
        let mut pending = Vec::new();

        for task in self.tasks() {
            tracing::info!(task = %task.name(), "Running shutdown task");
            if !task.execute() {
                tracing::warn!(task = %task.name(), "Shutdown aborted by task");
                return ShutdownOutcome::Aborted {
                    task: task.name().to_string(),
                };
            }

            if task.is_parallel() {
                parallel.push(task);
            } else if !self.wait_for(task.as_ref(), deadline).await {
                pending.push(task.name().to_string());
            }
        }

        for task in parallel {
            if !self.wait_for(task.as_ref(), deadline).await {
                pending.push(task.name().to_string());
            }
        }

        if pending.is_empty() {
            tracing::info!("Shutdown tasks complete");
            ShutdownOutcome::Completed
        } else {
            tracing::warn!(pending = ?pending, "Shutdown tasks still running at deadline");
            ShutdownOutcome::TimedOut { pending }
        }
    }

    async fn wait_for(&self, task: &dyn ShutdownTask, deadline: Instant) -> bool {
        loop {
            if task.is_complete() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn ShutdownTask>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::from_config(&ShutdownConfig::default())
    }
}

impl std::fmt::Debug for ShutdownManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.lock().iter().map(|t| t.name().to_string()).collect();
        f.debug_struct("ShutdownManager")
            .field("tasks", &names)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

fn same_task(a: &Arc<dyn ShutdownTask>, b: &Arc<dyn ShutdownTask>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
