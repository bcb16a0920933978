//! Bounded message queues
//!
//! A [`Queue`] pairs an input contract (what subscribers wait on) with a
//! sending side. [`QueueSender`] clones are `Send + Sync` and may be handed
//! to producer threads; the loop drains one value per dispatch turn.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::mailbox::Mailbox;
use crate::config::QueueFullPolicy;
use crate::contract::Contract;
use crate::error::QueueError;

/// Sending side of a queue
pub struct QueueSender<T> {
    mailbox: Arc<Mailbox<T>>,
    policy: QueueFullPolicy,
}

impl<T> QueueSender<T> {
    pub(crate) fn new(mailbox: Arc<Mailbox<T>>, policy: QueueFullPolicy) -> Self {
        Self { mailbox, policy }
    }

    /// Append a value.
    ///
    /// With [`QueueFullPolicy::Block`] a full queue blocks the caller until
    /// the loop drains a value. Called on the loop thread itself, a full
    /// queue fails with [`QueueError::Full`] rather than deadlocking.
    pub fn send(&self, value: T) -> Result<(), QueueError> {
        match self.policy {
            QueueFullPolicy::Block => self.mailbox.push_blocking(value, None),
            QueueFullPolicy::Reject => self.mailbox.try_push(value),
        }
    }

    /// Append a value without ever blocking
    pub fn try_send(&self, value: T) -> Result<(), QueueError> {
        self.mailbox.try_push(value)
    }

    /// Append a value, waiting at most `timeout` for a free slot
    pub fn send_timeout(&self, value: T, timeout: Duration) -> Result<(), QueueError> {
        self.mailbox.push_blocking(value, Some(timeout))
    }

    pub fn len(&self) -> usize {
        self.mailbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.mailbox.capacity()
    }

    /// True once the owning loop has been torn down
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
            policy: self.policy,
        }
    }
}

impl<T> fmt::Debug for QueueSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueSender")
            .field("contract", &self.mailbox.contract())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Fixed-capacity FIFO queue bound to an input contract
pub struct Queue<T> {
    input: Contract<T>,
    sender: QueueSender<T>,
}

impl<T> Queue<T> {
    pub(crate) fn new(input: Contract<T>, sender: QueueSender<T>) -> Self {
        Self { input, sender }
    }

    /// Contract subscribers wait on; each firing delivers one dequeued value
    pub fn input(&self) -> Contract<T> {
        self.input
    }

    /// A sender that can be moved to another thread
    pub fn sender(&self) -> QueueSender<T> {
        self.sender.clone()
    }

    pub fn send(&self, value: T) -> Result<(), QueueError> {
        self.sender.send(value)
    }

    pub fn try_send(&self, value: T) -> Result<(), QueueError> {
        self.sender.try_send(value)
    }

    pub fn send_timeout(&self, value: T, timeout: Duration) -> Result<(), QueueError> {
        self.sender.send_timeout(value, timeout)
    }

    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    /// Readiness as seen by the dispatcher
    pub fn is_ready(&self) -> bool {
        !self.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            input: self.input,
            sender: self.sender.clone(),
        }
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("input", &self.input)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
