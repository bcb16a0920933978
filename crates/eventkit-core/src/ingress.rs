//! Ready-set ingress
//!
//! The single handoff point between producer contexts (interrupt shims,
//! producer threads, blocked queue senders) and the loop thread. Producers
//! post arrivals; the loop drains them in arrival order and sleeps on the
//! condition variable when nothing is ready.
//!
//! Lock order: a mailbox lock may be held while posting here, never the
//! other way round.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Instant;

use crate::contract::ContractId;

/// A contract that became ready, stamped with when it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Arrival {
    pub contract: ContractId,
    pub at: Instant,
    pub seq: u64,
}

#[derive(Debug, Default)]
struct IngressState {
    ready: VecDeque<Arrival>,
    next_seq: u64,
    stop_requested: bool,
    closed: bool,
    loop_thread: Option<ThreadId>,
}

#[derive(Debug, Default)]
pub(crate) struct Ingress {
    state: Mutex<IngressState>,
    wake: Condvar,
}

impl Ingress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark a contract ready. Returns false once the loop is torn down.
    pub fn post(&self, contract: ContractId) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.ready.push_back(Arrival {
            contract,
            at: Instant::now(),
            seq,
        });
        self.wake.notify_one();
        true
    }

    pub fn request_stop(&self) {
        let mut state = self.state.lock();
        state.stop_requested = true;
        self.wake.notify_one();
    }

    /// Move every posted arrival into `pending`, preserving arrival order.
    /// Returns true if a stop was requested from another context.
    pub fn drain_into(&self, pending: &mut VecDeque<Arrival>) -> bool {
        let mut state = self.state.lock();
        pending.extend(state.ready.drain(..));
        std::mem::take(&mut state.stop_requested)
    }

    /// Sleep until something is posted, a stop is requested, or `deadline`
    /// passes. Returns immediately if arrivals are already waiting.
    pub fn wait(&self, deadline: Option<Instant>) {
        let mut state = self.state.lock();
        if !state.ready.is_empty() || state.stop_requested || state.closed {
            return;
        }
        match deadline {
            Some(deadline) => {
                let _ = self.wake.wait_until(&mut state, deadline);
            }
            None => self.wake.wait(&mut state),
        }
    }

    /// Record the calling thread as the loop thread
    pub fn enter(&self) {
        self.state.lock().loop_thread = Some(thread::current().id());
    }

    pub fn is_loop_thread(&self) -> bool {
        self.state.lock().loop_thread == Some(thread::current().id())
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.ready.clear();
        state.loop_thread = None;
        self.wake.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Thread-safe handle that asks the loop to stop after its current turn
///
/// Obtained from [`EventLoop::stop_handle`](crate::EventLoop::stop_handle);
/// usable from producer threads or interrupt shims.
#[derive(Debug, Clone)]
pub struct StopHandle {
    ingress: Arc<Ingress>,
}

impl StopHandle {
    pub(crate) fn new(ingress: Arc<Ingress>) -> Self {
        Self { ingress }
    }

    pub fn stop(&self) {
        tracing::debug!("Stop requested from outside the loop");
        self.ingress.request_stop();
    }
}
