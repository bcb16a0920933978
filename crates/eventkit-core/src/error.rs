//! Error handling for EventKit
//!
//! Provides the error types for every layer of the event loop:
//! - Loop errors (construction, subscription, dispatch failures)
//! - Queue errors (sending into bounded queues)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::contract::ContractId;
use crate::subscription::SubscriptionId;

/// Queue error type
///
/// Returned by the sending side of a queue. Senders may live on other
/// threads, so this type is `Clone + Send + Sync`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Queue has no free slot and the send could not wait for one
    #[error("Queue is full (capacity {capacity})")]
    Full {
        /// The fixed capacity of the queue.
        capacity: usize,
    },

    /// No slot became free before the timeout elapsed
    #[error("Queue send timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// The owning event loop has been torn down
    #[error("Queue is closed")]
    Closed,
}

/// Event loop error type
///
/// Configuration errors are raised synchronously at the call site.
/// Callback errors are fatal to the whole loop.
#[derive(Error, Debug)]
pub enum LoopError {
    /// Timer interval must be strictly positive
    #[error("Invalid timer interval: {interval_ms}ms (must be > 0)")]
    InvalidInterval {
        /// The rejected interval in milliseconds.
        interval_ms: u64,
    },

    /// Queue or signal capacity must be strictly positive and within limits
    #[error("Invalid capacity {capacity}: {reason}")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
        /// Why the capacity was rejected.
        reason: String,
    },

    /// Contract was created by a different event loop
    #[error("Contract {contract} belongs to another event loop")]
    ForeignContract {
        /// The rejected contract.
        contract: ContractId,
    },

    /// Contract was released after its oneshot timer fired
    #[error("Contract {contract} has expired")]
    ExpiredContract {
        /// The released contract.
        contract: ContractId,
    },

    /// Registry already holds the configured maximum of subscriptions
    #[error("Subscription limit of {limit} reached")]
    SubscriptionLimit {
        /// The configured limit.
        limit: usize,
    },

    /// A source delivered an item the subscription cannot accept
    #[error("Item delivered on {contract} does not match the subscribed type")]
    ItemType {
        /// The contract whose item was rejected.
        contract: ContractId,
    },

    /// A callback returned an error; the loop is terminated
    #[error("Callback of {subscription} failed: {source}")]
    Callback {
        /// The subscription whose callback failed.
        subscription: SubscriptionId,
        /// The error raised by the callback.
        #[source]
        source: anyhow::Error,
    },

    /// Invalid loop configuration
    #[error("Invalid loop configuration: {reason}")]
    InvalidConfig {
        /// The reason the configuration was rejected.
        reason: String,
    },

    /// Queue operation failed
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl LoopError {
    /// Check if this error came from a failing callback
    pub fn is_callback_error(&self) -> bool {
        matches!(self, LoopError::Callback { .. })
    }

    /// Check if this is a construction-time configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LoopError::InvalidInterval { .. }
                | LoopError::InvalidCapacity { .. }
                | LoopError::InvalidConfig { .. }
        )
    }
}
