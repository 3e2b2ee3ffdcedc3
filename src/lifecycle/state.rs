//! Server lifecycle states.
//!
//! ```text
//! Idle → Starting → Started → Stopping → Stopped
//!           │          │          ▲
//!           └──────────┴→ Failed ─┘
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No transport created yet.
    Idle,
    /// Start requested; transport binding.
    Starting,
    /// Transport accepting connections.
    Started,
    /// Start or serve failed. A stop may still follow.
    Failed,
    /// Stop in progress.
    Stopping,
    /// Transport torn down.
    Stopped,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Starting => "starting",
            LifecycleState::Started => "started",
            LifecycleState::Failed => "failed",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        }
    }

    /// No further transition except through stop.
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            LifecycleState::Started | LifecycleState::Failed | LifecycleState::Stopped
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
