//! Event loop configuration

use serde::{Deserialize, Serialize};

use crate::error::LoopError;

/// What `Queue::send` does when the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueFullPolicy {
    /// Block the sending thread until a slot frees up. Sends issued on the
    /// loop thread itself still fail instead of deadlocking.
    #[default]
    Block,
    /// Fail immediately with `QueueError::Full`
    Reject,
}

impl std::fmt::Display for QueueFullPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Configuration for an event loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Behaviour of `send` on a full queue.
    pub queue_full_policy: QueueFullPolicy,
    /// Largest capacity a queue may be created with.
    pub max_queue_capacity: usize,
    /// Default number of undelivered items a signal source buffers.
    pub signal_backlog: usize,
    /// Maximum number of live subscriptions.
    pub max_subscriptions: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            queue_full_policy: QueueFullPolicy::Block,
            max_queue_capacity: 1024,
            signal_backlog: 8,
            max_subscriptions: 256,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<(), LoopError> {
        if self.max_queue_capacity == 0 {
            return Err(LoopError::InvalidConfig {
                reason: "max_queue_capacity must be > 0".to_string(),
            });
        }

        if self.signal_backlog == 0 {
            return Err(LoopError::InvalidConfig {
                reason: "signal_backlog must be > 0".to_string(),
            });
        }

        if self.signal_backlog > self.max_queue_capacity {
            return Err(LoopError::InvalidConfig {
                reason: "signal_backlog must not exceed max_queue_capacity".to_string(),
            });
        }

        if self.max_subscriptions == 0 {
            return Err(LoopError::InvalidConfig {
                reason: "max_subscriptions must be > 0".to_string(),
            });
        }

        Ok(())
    }
}
