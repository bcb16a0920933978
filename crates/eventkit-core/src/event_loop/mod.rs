//! Event loop
//!
//! [`EventLoop`] owns every contract and subscription and runs the dispatch
//! turns. Callbacks see the loop through a [`Turn`], which exposes the
//! [`Scheduler`] but not `run()`.

mod dispatcher;
mod scheduler;
mod turn;

pub use dispatcher::EventLoop;
pub use scheduler::Scheduler;
pub use turn::Turn;

use serde::Serialize;

/// Lifecycle state of a loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    /// Configured but not running
    Idle,
    /// Blocked until a timer deadline or an external arrival
    Waiting,
    /// Invoking callbacks for one ready contract
    Dispatching,
    /// Terminated; all sources are closed
    Stopped,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Idle => write!(f, "idle"),
            LoopState::Waiting => write!(f, "waiting"),
            LoopState::Dispatching => write!(f, "dispatching"),
            LoopState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Counters reported when `run()` returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Dispatch turns executed
    pub turns: u64,
    /// Callback invocations across all turns
    pub invocations: u64,
}
