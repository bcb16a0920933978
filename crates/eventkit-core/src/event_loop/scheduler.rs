//! Scheduler
//!
//! The part of the loop that both setup code and running callbacks may
//! touch: creating contracts, subscribing, cancelling and requesting a stop.
//! [`EventLoop`](super::EventLoop) and [`Turn`](super::Turn) both deref to it.

use std::time::Instant;

use super::LoopState;
use crate::config::LoopConfig;
use crate::contract::{Contract, ContractId, ContractKind};
use crate::error::LoopError;
use crate::ingress::Ingress;
use crate::sources::{Queue, QueueSender, Signal, SignalSource, Sources, TimerMode};
use crate::subscription::{CallbackResult, SubscriptionHandle, SubscriptionRegistry, Threaded};

use super::Turn;

pub struct Scheduler {
    pub(super) sources: Sources,
    pub(super) registry: SubscriptionRegistry,
    pub(super) config: LoopConfig,
    pub(super) state: LoopState,
    pub(super) stop_requested: bool,
}

impl Scheduler {
    pub(super) fn new(loop_id: u32, config: LoopConfig) -> Self {
        Self {
            sources: Sources::new(loop_id, Ingress::new()),
            registry: SubscriptionRegistry::new(config.max_subscriptions),
            config,
            state: LoopState::Idle,
            stop_requested: false,
        }
    }

    /// Create a timer contract.
    ///
    /// Fails with `InvalidInterval` when `interval_ms` is zero. The first
    /// deadline is `interval_ms` from now.
    pub fn timer(&mut self, mode: TimerMode, interval_ms: u64) -> Result<Contract<()>, LoopError> {
        let contract = self
            .sources
            .create_timer(mode, interval_ms, Instant::now())?;
        tracing::debug!("Created {} timer {} ({}ms)", mode, contract.id(), interval_ms);
        Ok(contract)
    }

    /// Create a bounded queue.
    ///
    /// Fails with `InvalidCapacity` when `capacity` is zero or above the
    /// configured maximum.
    pub fn queue<T: Send + 'static>(&mut self, capacity: usize) -> Result<Queue<T>, LoopError> {
        self.check_capacity(capacity)?;
        let (input, mailbox) = self.sources.create_mailbox(ContractKind::Queue, capacity);
        tracing::debug!("Created queue {} (capacity {})", input.id(), capacity);
        Ok(Queue::new(
            input,
            QueueSender::new(mailbox, self.config.queue_full_policy),
        ))
    }

    /// Create an external signal with the configured default backlog
    pub fn signal<T: Send + 'static>(&mut self) -> Result<Signal<T>, LoopError> {
        self.signal_with_backlog(self.config.signal_backlog)
    }

    pub fn signal_with_backlog<T: Send + 'static>(
        &mut self,
        backlog: usize,
    ) -> Result<Signal<T>, LoopError> {
        self.check_capacity(backlog)?;
        let (contract, mailbox) = self.sources.create_mailbox(ContractKind::Signal, backlog);
        tracing::debug!("Created signal {} (backlog {})", contract.id(), backlog);
        Ok(Signal::new(contract, SignalSource::new(mailbox)))
    }

    fn check_capacity(&self, capacity: usize) -> Result<(), LoopError> {
        if capacity == 0 {
            return Err(LoopError::InvalidCapacity {
                capacity,
                reason: "must be > 0".to_string(),
            });
        }
        if capacity > self.config.max_queue_capacity {
            return Err(LoopError::InvalidCapacity {
                capacity,
                reason: format!("exceeds maximum of {}", self.config.max_queue_capacity),
            });
        }
        Ok(())
    }

    /// Bind `callback` to `contract` with `initial` as its first state.
    ///
    /// On every firing the callback receives the turn context, the item and
    /// its current state; the `Some` it returns becomes the next state.
    /// Fails with `ExpiredContract` once a fired oneshot has been released.
    pub fn subscribe<T, S, F>(
        &mut self,
        contract: &Contract<T>,
        initial: S,
        callback: F,
    ) -> Result<SubscriptionHandle, LoopError>
    where
        T: Clone + 'static,
        S: Clone + 'static,
        F: FnMut(&mut Turn<'_>, T, S) -> CallbackResult<S> + 'static,
    {
        self.sources.check(contract.id())?;
        let id = self.registry.insert(
            contract.id(),
            Box::new(Threaded::<T, S, F>::new(initial, callback)),
        )?;
        tracing::debug!("Subscription {} added on {}", id, contract.id());
        Ok(SubscriptionHandle::new(id, contract.id()))
    }

    /// Cancel a subscription. Idempotent; an invocation already selected for
    /// the current turn but not yet run will not happen.
    pub fn cancel(&mut self, handle: SubscriptionHandle) -> bool {
        let cancelled = self.registry.cancel(handle.id());
        if cancelled {
            tracing::debug!("Subscription {} cancelled", handle.id());
        }
        cancelled
    }

    pub fn is_active(&self, handle: SubscriptionHandle) -> bool {
        self.registry.is_active(handle.id())
    }

    /// Request termination once the current turn completes
    pub fn stop(&mut self) {
        if !self.stop_requested {
            tracing::debug!("Stop requested");
        }
        self.stop_requested = true;
    }

    pub fn is_stopping(&self) -> bool {
        self.stop_requested
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn loop_id(&self) -> u32 {
        self.sources.loop_id()
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.active_count()
    }

    pub fn contract_count(&self) -> usize {
        self.sources.len()
    }

    /// Kind of a contract owned by this loop
    pub fn contract_kind(&self, contract: ContractId) -> Option<ContractKind> {
        if contract.loop_id() != self.loop_id() {
            return None;
        }
        self.sources.kind(contract)
    }

    /// Whether a timer contract can still fire
    pub fn is_timer_armed(&self, contract: ContractId) -> bool {
        self.sources.timers().is_armed(contract)
    }

    /// Items buffered on a queue or signal contract
    pub fn pending_items(&self, contract: ContractId) -> usize {
        self.sources.pending_items(contract)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("loop_id", &self.loop_id())
            .field("state", &self.state)
            .field("contracts", &self.contract_count())
            .field("registry", &self.registry)
            .field("stop_requested", &self.stop_requested)
            .finish()
    }
}
