//! Shutdown tasks.
//!
//! A task is executed once by the [`ShutdownManager`](super::ShutdownManager)
//! during orderly process termination. Parallel tasks return from `execute`
//! immediately and are polled through `is_complete`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::runtime::Handle;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A unit of work run by the shutdown sequencer.
pub trait ShutdownTask: Send + Sync {
    fn name(&self) -> &str;

    /// Run the task. Returning false aborts the shutdown sequence.
    fn execute(&self) -> bool;

    /// Whether the sequencer may move on before this task completes.
    fn is_parallel(&self) -> bool {
        false
    }

    fn is_complete(&self) -> bool {
        true
    }
}

type StopFn = Box<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Runs an async stop on its own task and reports completion through a
/// single-writer flag.
///
/// `execute` always accepts and never blocks. Failures (errors or panics) are
/// logged and still mark the task complete. Only the first `execute` call
/// starts a stop.
pub struct ParallelStopTask {
    name: String,
    runtime: Handle,
    stop: StopFn,
    started: AtomicBool,
    complete: Arc<AtomicBool>,
}

impl ParallelStopTask {
    pub fn new<F>(name: impl Into<String>, runtime: Handle, stop: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            runtime,
            stop: Box::new(stop),
            started: AtomicBool::new(false),
            complete: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ShutdownTask for ParallelStopTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> bool {
        if self.started.swap(true, Ordering::AcqRel) {
            return true;
        }

        let stop = self.runtime.spawn((self.stop)());
        let complete = Arc::clone(&self.complete);
        let name = self.name.clone();

        self.runtime.spawn(async move {
            match stop.await {
                Ok(Ok(())) => tracing::debug!(task = %name, "Shutdown task finished"),
                Ok(Err(e)) => {
                    tracing::warn!(task = %name, error = %e, "Error during shutdown task");
                    tracing::debug!(task = %name, error = ?e, "Details follow");
                }
                Err(e) => tracing::warn!(task = %name, error = %e, "Shutdown task panicked"),
            }
            complete.store(true, Ordering::Release);
        });

        true
    }

    fn is_parallel(&self) -> bool {
        true
    }

    fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ParallelStopTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelStopTask")
            .field("name", &self.name)
            .field("complete", &self.is_complete())
            .finish_non_exhaustive()
    }
}
