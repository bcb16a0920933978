//! Contracts
//!
//! A contract is the opaque identity of an event source the dispatcher can
//! wait on. Contracts are minted by the loop when a timer, queue or signal is
//! created; callback code only ever receives copies of them.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::arena::ArenaIndex;

static NEXT_LOOP_ID: AtomicU32 = AtomicU32::new(1);

/// Allocate a process-unique event loop identity
pub(crate) fn next_loop_id() -> u32 {
    NEXT_LOOP_ID.fetch_add(1, Ordering::Relaxed)
}

/// Untyped contract identifier
///
/// Carries the identity of the loop that created it so a contract can never
/// be resolved against a different loop's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractId {
    loop_id: u32,
    index: ArenaIndex,
}

impl ContractId {
    pub(crate) const fn new(loop_id: u32, index: ArenaIndex) -> Self {
        Self { loop_id, index }
    }

    /// Identity of the owning event loop
    pub fn loop_id(&self) -> u32 {
        self.loop_id
    }

    pub(crate) fn index(&self) -> ArenaIndex {
        self.index
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Contract({}:{}.{})",
            self.loop_id,
            self.index.slot(),
            self.index.generation()
        )
    }
}

/// Kind of source backing a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// Oneshot or periodic timer, delivers `()`
    Timer,
    /// Bounded FIFO queue, delivers the dequeued value
    Queue,
    /// External signal adapter, delivers a source-defined item
    Signal,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timer => write!(f, "timer"),
            Self::Queue => write!(f, "queue"),
            Self::Signal => write!(f, "signal"),
        }
    }
}

/// Typed contract delivering items of type `T`
pub struct Contract<T> {
    id: ContractId,
    kind: ContractKind,
    _item: PhantomData<fn() -> T>,
}

impl<T> Contract<T> {
    pub(crate) fn new(id: ContractId, kind: ContractKind) -> Self {
        Self {
            id,
            kind,
            _item: PhantomData,
        }
    }

    pub fn id(&self) -> ContractId {
        self.id
    }

    pub fn kind(&self) -> ContractKind {
        self.kind
    }
}

// Manual impls: `T` itself need not be Clone/Copy/Debug.
impl<T> Clone for Contract<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Contract<T> {}

impl<T> PartialEq for Contract<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Contract<T> {}

impl<T> fmt::Debug for Contract<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contract")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<T> fmt::Display for Contract<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}
