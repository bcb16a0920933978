//! Subscriptions
//!
//! A subscription binds one contract to one callback and the state threaded
//! through it. The callback receives its previous state by value and
//! returns the next one; returning `None` keeps the stored state.
//!
//! ```rust,ignore
//! let tick = ev.timer(TimerMode::Periodic, 100)?;
//! ev.subscribe(&tick, 0u32, |turn, (), count| {
//!     if count == 9 {
//!         turn.stop();
//!     }
//!     Ok(Some(count + 1))
//! })?;
//! ```

mod registry;

pub use registry::SubscriptionRegistry;

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::arena::ArenaIndex;
use crate::contract::ContractId;
use crate::error::LoopError;
use crate::event_loop::{Scheduler, Turn};

/// What a callback returns: the next state, `None` to keep the current one,
/// or an error that terminates the loop.
pub type CallbackResult<S> = anyhow::Result<Option<S>>;

/// Stable identifier of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(ArenaIndex);

impl SubscriptionId {
    pub(crate) fn from_index(index: ArenaIndex) -> Self {
        Self(index)
    }

    pub(crate) fn index(&self) -> ArenaIndex {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sub({}.{})", self.0.slot(), self.0.generation())
    }
}

/// Cancel handle returned by `subscribe`
///
/// Handles are plain values; once the subscription is reclaimed the handle
/// goes stale and every operation on it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    contract: ContractId,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: SubscriptionId, contract: ContractId) -> Self {
        Self { id, contract }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Contract this subscription listens on
    pub fn contract(&self) -> ContractId {
        self.contract
    }

    /// Cancel the subscription. Idempotent; returns true only for the call
    /// that actually cancelled it.
    pub fn cancel(self, scheduler: &mut Scheduler) -> bool {
        scheduler.cancel(self)
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.id, self.contract)
    }
}

/// Type-erased callback plus its state
pub(crate) trait Handler {
    fn invoke(
        &mut self,
        turn: &mut Turn<'_>,
        contract: ContractId,
        item: &(dyn Any + Send),
    ) -> Result<(), LoopError>;
}

/// Callback with explicitly threaded state `S`, delivered items of type `T`
pub(crate) struct Threaded<T, S, F> {
    state: S,
    callback: F,
    _item: PhantomData<fn(T)>,
}

impl<T, S, F> Threaded<T, S, F> {
    pub fn new(state: S, callback: F) -> Self {
        Self {
            state,
            callback,
            _item: PhantomData,
        }
    }
}

impl<T, S, F> Handler for Threaded<T, S, F>
where
    T: Clone + 'static,
    S: Clone + 'static,
    F: FnMut(&mut Turn<'_>, T, S) -> CallbackResult<S>,
{
    fn invoke(
        &mut self,
        turn: &mut Turn<'_>,
        contract: ContractId,
        item: &(dyn Any + Send),
    ) -> Result<(), LoopError> {
        let item = item
            .downcast_ref::<T>()
            .cloned()
            .ok_or(LoopError::ItemType { contract })?;
        let subscription = turn.subscription().id();

        match (self.callback)(turn, item, self.state.clone()) {
            Ok(Some(next)) => self.state = next,
            Ok(None) => {}
            Err(source) => {
                return Err(LoopError::Callback {
                    subscription,
                    source,
                })
            }
        }
        Ok(())
    }
}
