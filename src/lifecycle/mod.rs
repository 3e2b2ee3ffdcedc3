//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Controller (server/):
//!     Idle → Starting → Started → Stopping → Stopped   (state.rs)
//!
//! Stop fan-out (shutdown.rs):
//!     ShutdownSignal::trigger → accept loop exits → connections drain
//!
//! Process termination (manager.rs, task.rs):
//!     signal (signals.rs) → ShutdownManager::run
//!         → each ShutdownTask::execute
//!         → poll is_complete() on parallel tasks until deadline
//! ```
//!
//! # Design Decisions
//! - Shutdown has timeout: the sequencer stops waiting after its deadline
//! - A hanging task cannot stall the others (parallel tasks)

pub mod manager;
pub mod shutdown;
pub mod signals;
pub mod state;
pub mod task;

pub use manager::{ShutdownManager, ShutdownOutcome};
pub use shutdown::ShutdownSignal;
pub use state::LifecycleState;
pub use task::{BoxError, ParallelStopTask, ShutdownTask};
