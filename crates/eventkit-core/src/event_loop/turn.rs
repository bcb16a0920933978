//! Per-invocation context handed to callbacks

use std::ops::{Deref, DerefMut};
use std::time::Instant;

use super::Scheduler;
use crate::contract::ContractId;
use crate::subscription::SubscriptionHandle;

/// Context for one callback invocation
///
/// Gives the callback its own subscription handle and scheduler access.
/// There is no way to re-enter `run()` from here.
pub struct Turn<'a> {
    scheduler: &'a mut Scheduler,
    subscription: SubscriptionHandle,
    started: Instant,
}

impl<'a> Turn<'a> {
    pub(crate) fn new(scheduler: &'a mut Scheduler, subscription: SubscriptionHandle) -> Self {
        Self {
            scheduler,
            subscription,
            started: Instant::now(),
        }
    }

    /// Handle of the subscription being invoked
    pub fn subscription(&self) -> SubscriptionHandle {
        self.subscription
    }

    /// Contract that fired
    pub fn contract(&self) -> ContractId {
        self.subscription.contract()
    }

    /// Cancel the subscription being invoked; it will not fire again
    pub fn cancel_self(&mut self) -> bool {
        let handle = self.subscription;
        self.scheduler.cancel(handle)
    }

    /// When this invocation started
    pub fn started(&self) -> Instant {
        self.started
    }
}

impl Deref for Turn<'_> {
    type Target = Scheduler;

    fn deref(&self) -> &Scheduler {
        self.scheduler
    }
}

impl DerefMut for Turn<'_> {
    fn deref_mut(&mut self) -> &mut Scheduler {
        self.scheduler
    }
}
