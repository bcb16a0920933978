//! # EventKit Core
//!
//! Cooperative, single-threaded event loop with a subscription scheduler.
//!
//! A script creates contracts (timers, bounded queues, external signals),
//! subscribes callbacks to them with an initial state, and hands control to
//! [`EventLoop::run`]. Each dispatch turn fires the earliest-ready contract;
//! every active subscription on it is invoked in registration order, gets
//! its previous state by value and returns the next one.
//!
//! ```rust,ignore
//! use eventkit_core::{EventLoop, TimerMode};
//!
//! let mut ev = EventLoop::new();
//! let tick = ev.timer(TimerMode::Periodic, 1)?;
//! let queue = ev.queue::<u32>(16)?;
//!
//! let tx = queue.clone();
//! ev.subscribe(&tick, 0u32, move |_, (), n| {
//!     tx.send(n)?;
//!     Ok(Some(n + 1))
//! })?;
//! ev.subscribe(&queue.input(), 0u32, |turn, n, seen| {
//!     if seen + 1 == 10 {
//!         turn.stop();
//!     }
//!     Ok(Some(seen + 1))
//! })?;
//!
//! let summary = ev.run()?;
//! ```

pub mod arena;
pub mod config;
pub mod contract;
pub mod error;
pub mod event_loop;
pub(crate) mod ingress;
pub mod sources;
pub mod subscription;

pub use config::{LoopConfig, QueueFullPolicy};
pub use contract::{Contract, ContractId, ContractKind};
pub use error::{LoopError, QueueError};
pub use event_loop::{EventLoop, LoopState, RunSummary, Scheduler, Turn};
pub use ingress::StopHandle;
pub use sources::{Queue, QueueSender, Signal, SignalSource, TimerMode};
pub use subscription::{CallbackResult, SubscriptionHandle, SubscriptionId, SubscriptionRegistry};
