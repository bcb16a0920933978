//! Bounded mailbox shared by queues and signal sources
//!
//! The ring buffer lives behind a mutex so producers on other threads can
//! append while the loop drains. The mailbox posts its contract to the
//! ingress on the empty -> non-empty edge and again after each drain that
//! leaves items behind, so exactly one arrival is outstanding while
//! `len > 0`.

use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::contract::ContractId;
use crate::error::QueueError;
use crate::ingress::Ingress;

/// Fixed-capacity FIFO ring
#[derive(Debug)]
pub(crate) struct RingBuffer<T> {
    buf: Vec<Option<T>>,
    head: usize, // next to read
    tail: usize, // next to write
    len: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let mut buf = Vec::with_capacity(capacity);
        buf.resize_with(capacity, || None);
        Self {
            buf,
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        self.buf[self.tail] = Some(value);
        self.tail = (self.tail + 1) % self.buf.len();
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.buf[self.head].take();
        self.head = (self.head + 1) % self.buf.len();
        self.len -= 1;
        value
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.buf.len()
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

#[derive(Debug)]
struct MailboxState<T> {
    ring: RingBuffer<T>,
    closed: bool,
}

#[derive(Debug)]
pub(crate) struct Mailbox<T> {
    contract: ContractId,
    state: Mutex<MailboxState<T>>,
    not_full: Condvar,
    ingress: Arc<Ingress>,
}

impl<T> Mailbox<T> {
    pub fn new(contract: ContractId, capacity: usize, ingress: Arc<Ingress>) -> Self {
        Self {
            contract,
            state: Mutex::new(MailboxState {
                ring: RingBuffer::new(capacity),
                closed: false,
            }),
            not_full: Condvar::new(),
            ingress,
        }
    }

    pub fn contract(&self) -> ContractId {
        self.contract
    }

    /// Append without waiting
    pub fn try_push(&self, value: T) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(QueueError::Closed);
        }
        let capacity = state.ring.capacity();
        self.append(&mut state, value)
            .map_err(|_| QueueError::Full { capacity })
    }

    /// Append, waiting for a free slot up to `timeout` (forever when `None`).
    ///
    /// Waiting on the loop thread would deadlock: the loop is the only
    /// consumer. In that case the push fails with `Full` instead. A timeout
    /// too large to express as an instant waits forever.
    pub fn push_blocking(&self, value: T, timeout: Option<Duration>) -> Result<(), QueueError> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(QueueError::Closed);
            }
            if !state.ring.is_full() {
                break;
            }

            let capacity = state.ring.capacity();
            if self.ingress.is_loop_thread() {
                tracing::warn!(
                    "Send on full {} from the loop thread; refusing to block",
                    self.contract
                );
                return Err(QueueError::Full { capacity });
            }

            match deadline {
                Some(deadline) => {
                    if self.not_full.wait_until(&mut state, deadline).timed_out()
                        && state.ring.is_full()
                    {
                        let timeout_ms = timeout
                            .map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
                        return Err(QueueError::Timeout { timeout_ms });
                    }
                }
                None => self.not_full.wait(&mut state),
            }
        }

        let capacity = state.ring.capacity();
        self.append(&mut state, value)
            .map_err(|_| QueueError::Full { capacity })
    }

    fn append(&self, state: &mut MailboxState<T>, value: T) -> Result<(), T> {
        let was_empty = state.ring.is_empty();
        state.ring.push(value)?;
        if was_empty {
            self.ingress.post(self.contract);
        }
        Ok(())
    }

    /// Remove the oldest item, re-posting readiness if more remain
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        let value = state.ring.pop()?;
        if !state.ring.is_empty() {
            self.ingress.post(self.contract);
        }
        self.not_full.notify_one();
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.state.lock().ring.len()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().ring.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.not_full.notify_all();
    }
}

/// Type-erased view the dispatcher drains through
pub(crate) trait ItemSource: Send + Sync {
    fn take(&self) -> Option<Box<dyn Any + Send>>;
    fn pending(&self) -> usize;
    fn close(&self);
}

impl<T: Send + 'static> ItemSource for Mailbox<T> {
    fn take(&self) -> Option<Box<dyn Any + Send>> {
        self.pop().map(|v| Box::new(v) as Box<dyn Any + Send>)
    }

    fn pending(&self) -> usize {
        self.len()
    }

    fn close(&self) {
        Mailbox::close(self);
    }
}
