//! Dispatcher
//!
//! Drives `Idle -> Waiting -> Dispatching -> Waiting -> ... -> Stopped`.
//! Each dispatch turn picks the single earliest-ready contract, invokes its
//! active subscriptions in registration order and applies their returned
//! state.

use std::any::Any;
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use super::{LoopState, RunSummary, Scheduler, Turn};
use crate::config::LoopConfig;
use crate::contract::{next_loop_id, ContractId};
use crate::error::LoopError;
use crate::ingress::{Arrival, Ingress, StopHandle};
use crate::subscription::{SubscriptionHandle, SubscriptionId};

/// What a dispatch turn will fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ready {
    Timer(ContractId),
    /// Index into the pending arrival list
    Arrival(usize),
}

/// Ordering key: ready instant, earliest registration among the contract's
/// subscribers, then source sequence
type ReadyKey = (Instant, u64, u64);

/// Cooperative event loop
///
/// Created at script start, configured through its [`Scheduler`] methods,
/// and consumed by [`run`](EventLoop::run).
pub struct EventLoop {
    scheduler: Scheduler,
    ingress: Arc<Ingress>,
    pending: VecDeque<Arrival>,
    summary: RunSummary,
}

impl EventLoop {
    /// Create a new event loop with default configuration
    pub fn new() -> Self {
        Self::build(LoopConfig::default())
    }

    /// Create a new event loop with custom configuration
    pub fn with_config(config: LoopConfig) -> Result<Self, LoopError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: LoopConfig) -> Self {
        let scheduler = Scheduler::new(next_loop_id(), config);
        let ingress = scheduler.sources.ingress().clone();
        // Callbacks are not `Send`, so the building thread is the one that runs
        // the loop. Blocking sends from it must fail even before `run`.
        ingress.enter();
        Self {
            scheduler,
            ingress,
            pending: VecDeque::new(),
            summary: RunSummary::default(),
        }
    }

    /// Handle other threads can use to stop the loop after its current turn
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(self.ingress.clone())
    }

    /// Run until `stop()` is observed at a turn boundary.
    ///
    /// Blocks the calling thread while nothing is ready. A callback error
    /// terminates the loop and is returned as [`LoopError::Callback`]. The
    /// loop is torn down either way: subscriptions are dropped and every
    /// queue and signal source is closed.
    pub fn run(mut self) -> Result<RunSummary, LoopError> {
        let span = tracing::info_span!("event_loop", id = self.scheduler.loop_id());
        let _enter = span.enter();

        tracing::info!(
            "Event loop started with {} subscriptions on {} contracts",
            self.scheduler.subscription_count(),
            self.scheduler.contract_count()
        );

        let result = self.run_turns();
        self.teardown();

        match &result {
            Ok(summary) => tracing::info!(
                "Event loop stopped after {} turns ({} invocations)",
                summary.turns,
                summary.invocations
            ),
            Err(e) => tracing::error!("Event loop terminated: {}", e),
        }
        result
    }

    fn run_turns(&mut self) -> Result<RunSummary, LoopError> {
        loop {
            if self.scheduler.stop_requested {
                break;
            }
            if self.ingress.drain_into(&mut self.pending) {
                self.scheduler.stop_requested = true;
                break;
            }

            let now = Instant::now();
            self.expire_unobserved_timers(now);
            self.release_spent_timers();

            match self.select(now) {
                Some(ready) => {
                    self.scheduler.state = LoopState::Dispatching;
                    self.dispatch(ready)?;
                    self.scheduler.registry.reap();
                    self.summary.turns += 1;
                }
                None => {
                    self.scheduler.state = LoopState::Waiting;
                    let deadline = self.scheduler.sources.timers().next_deadline();
                    self.ingress.wait(deadline);
                }
            }
        }

        self.scheduler.state = LoopState::Stopped;
        Ok(self.summary)
    }

    /// Due timers nobody listens to advance without a turn, so a late
    /// subscriber does not see a burst of catch-up firings.
    fn expire_unobserved_timers(&mut self, now: Instant) {
        let idle: Vec<ContractId> = self
            .scheduler
            .sources
            .timers()
            .due(now)
            .into_iter()
            .map(|due| due.contract)
            .filter(|contract| !self.scheduler.registry.has_active(*contract))
            .collect();

        for contract in idle {
            tracing::trace!("Timer {} elapsed with no subscribers", contract);
            self.scheduler.sources.timers_mut().fire(contract);
        }
    }

    /// Fired oneshots keep their contract while a subscription (even a
    /// dormant one) refers to it; the rest are released here.
    fn release_spent_timers(&mut self) {
        let registry = &self.scheduler.registry;
        let released = self
            .scheduler
            .sources
            .release_spent(|contract| registry.has_subscriptions(contract));
        if released > 0 {
            tracing::trace!("Released {} spent oneshot timers", released);
        }
    }

    /// Pick the earliest-ready contract that has at least one active
    /// subscription. Buffered items on unobserved contracts stay pending.
    fn select(&self, now: Instant) -> Option<Ready> {
        let registry = &self.scheduler.registry;
        let sources = &self.scheduler.sources;
        let mut best: Option<(ReadyKey, Ready)> = None;

        let timers = sources.timers().due(now).into_iter().filter_map(|due| {
            registry.first_seq(due.contract).map(|first| {
                (
                    (due.deadline, first, sources.seq(due.contract)),
                    Ready::Timer(due.contract),
                )
            })
        });

        let arrivals = self.pending.iter().enumerate().filter_map(|(i, arrival)| {
            registry
                .first_seq(arrival.contract)
                .map(|first| ((arrival.at, first, arrival.seq), Ready::Arrival(i)))
        });

        for (key, ready) in timers.chain(arrivals) {
            if best.as_ref().is_none_or(|(best_key, _)| key < *best_key) {
                best = Some((key, ready));
            }
        }

        best.map(|(_, ready)| ready)
    }

    fn dispatch(&mut self, ready: Ready) -> Result<(), LoopError> {
        let (contract, item): (ContractId, Box<dyn Any + Send>) = match ready {
            Ready::Timer(contract) => {
                self.scheduler.sources.timers_mut().fire(contract);
                (contract, Box::new(()))
            }
            Ready::Arrival(index) => {
                let Some(arrival) = self.pending.remove(index) else {
                    return Ok(());
                };
                match self.scheduler.sources.take_item(arrival.contract) {
                    Some(item) => (arrival.contract, item),
                    None => {
                        tracing::trace!("Arrival on {} had no item", arrival.contract);
                        return Ok(());
                    }
                }
            }
        };

        // Snapshot: subscriptions added during this turn wait for the next
        // firing; ones cancelled during it are skipped below.
        let targets: Vec<SubscriptionId> = self.scheduler.registry.resolve(contract).collect();
        tracing::trace!("Dispatching {} to {} subscriptions", contract, targets.len());

        for id in targets {
            let Some(mut handler) = self.scheduler.registry.take_handler(id) else {
                continue;
            };

            let result = {
                let mut turn = Turn::new(&mut self.scheduler, SubscriptionHandle::new(id, contract));
                handler.invoke(&mut turn, contract, item.as_ref())
            };
            self.scheduler.registry.restore_handler(id, handler);
            self.summary.invocations += 1;

            if let Err(e) = result {
                tracing::error!("Subscription {} failed on {}: {}", id, contract, e);
                return Err(e);
            }
        }

        Ok(())
    }

    fn teardown(&mut self) {
        self.scheduler.registry.clear();
        self.scheduler.sources.close_all();
        self.pending.clear();
        self.scheduler.state = LoopState::Stopped;
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        // Never-run loops still release blocked producers
        if !self.ingress.is_closed() {
            self.teardown();
        }
    }
}

impl Deref for EventLoop {
    type Target = Scheduler;

    fn deref(&self) -> &Scheduler {
        &self.scheduler
    }
}

impl DerefMut for EventLoop {
    fn deref_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("scheduler", &self.scheduler)
            .field("pending", &self.pending.len())
            .finish()
    }
}
