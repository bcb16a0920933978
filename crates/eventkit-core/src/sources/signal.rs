//! External signal sources
//!
//! The shim through which foreign events (interrupt edges, navigation keys,
//! device triggers) become contracts. The collaborator owns a
//! [`SignalSource`] and calls [`SignalSource::fire`] from whatever context
//! the event originates in; firing never blocks.

use std::fmt;
use std::sync::Arc;

use super::mailbox::Mailbox;
use crate::contract::Contract;
use crate::error::QueueError;

/// Firing side of a signal
pub struct SignalSource<T> {
    mailbox: Arc<Mailbox<T>>,
}

impl<T> SignalSource<T> {
    pub(crate) fn new(mailbox: Arc<Mailbox<T>>) -> Self {
        Self { mailbox }
    }

    /// Deliver an item to the loop.
    ///
    /// Returns false when the item was dropped: either the backlog is full
    /// (the loop has fallen behind) or the loop has been torn down.
    pub fn fire(&self, item: T) -> bool {
        match self.mailbox.try_push(item) {
            Ok(()) => true,
            Err(QueueError::Full { capacity }) => {
                tracing::warn!(
                    "Signal {} backlog full ({}), dropping item",
                    self.mailbox.contract(),
                    capacity
                );
                false
            }
            Err(_) => false,
        }
    }

    /// Items fired but not yet dispatched
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    pub fn backlog(&self) -> usize {
        self.mailbox.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }
}

impl<T> Clone for SignalSource<T> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<T> fmt::Debug for SignalSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalSource")
            .field("contract", &self.mailbox.contract())
            .field("pending", &self.pending())
            .finish()
    }
}

/// An external signal: contract for subscribers, source for the producer
pub struct Signal<T> {
    contract: Contract<T>,
    source: SignalSource<T>,
}

impl<T> Signal<T> {
    pub(crate) fn new(contract: Contract<T>, source: SignalSource<T>) -> Self {
        Self { contract, source }
    }

    pub fn contract(&self) -> Contract<T> {
        self.contract
    }

    pub fn source(&self) -> SignalSource<T> {
        self.source.clone()
    }

    pub fn fire(&self, item: T) -> bool {
        self.source.fire(item)
    }

    /// Split into the contract and the firing side
    pub fn into_parts(self) -> (Contract<T>, SignalSource<T>) {
        (self.contract, self.source)
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            contract: self.contract,
            source: self.source.clone(),
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("contract", &self.contract)
            .field("source", &self.source)
            .finish()
    }
}
