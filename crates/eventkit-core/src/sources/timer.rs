//! Timer service
//!
//! Tracks oneshot and periodic timers and answers "which deadlines have
//! elapsed". Owns no callback logic; the dispatcher decides what firing a
//! timer means.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::contract::ContractId;
use crate::error::LoopError;

/// Timer firing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// Fires exactly once
    Oneshot,
    /// Re-arms on a fixed phase after every firing
    Periodic,
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Oneshot => write!(f, "oneshot"),
            Self::Periodic => write!(f, "periodic"),
        }
    }
}

/// A single timer
#[derive(Debug, Clone)]
pub struct Timer {
    mode: TimerMode,
    interval: Duration,
    next_deadline: Instant,
    fired: bool,
}

impl Timer {
    /// Create a timer armed `interval_ms` after `now`
    pub fn new(mode: TimerMode, interval_ms: u64, now: Instant) -> Result<Self, LoopError> {
        if interval_ms == 0 {
            return Err(LoopError::InvalidInterval { interval_ms });
        }
        let interval = Duration::from_millis(interval_ms);
        Ok(Self {
            mode,
            interval,
            next_deadline: now + interval,
            fired: false,
        })
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    /// Oneshot timers disarm after their single firing
    pub fn is_armed(&self) -> bool {
        !self.fired
    }

    fn fire(&mut self) {
        match self.mode {
            // Fixed phase: advance from the previous deadline, not from now
            TimerMode::Periodic => self.next_deadline += self.interval,
            TimerMode::Oneshot => self.fired = true,
        }
    }
}

/// A timer whose deadline has elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTimer {
    pub contract: ContractId,
    pub deadline: Instant,
    /// Creation sequence, used for ties
    pub seq: u64,
}

/// Timer table, kept in creation order
///
/// A oneshot leaves the table once it fires and is remembered as spent
/// until its contract is released, so `due` and `next_deadline` only ever
/// scan armed timers.
#[derive(Debug, Default)]
pub struct TimerService {
    timers: Vec<(ContractId, u64, Timer)>,
    spent: Vec<ContractId>,
    next_seq: u64,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contract: ContractId, timer: Timer) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push((contract, seq, timer));
    }

    pub fn get(&self, contract: ContractId) -> Option<&Timer> {
        self.timers
            .iter()
            .find(|(id, _, _)| *id == contract)
            .map(|(_, _, t)| t)
    }

    pub fn is_armed(&self, contract: ContractId) -> bool {
        self.get(contract).is_some_and(Timer::is_armed)
    }

    /// Armed timers whose deadline is at or before `now`, ordered by
    /// deadline and then by creation sequence.
    pub fn due(&self, now: Instant) -> Vec<DueTimer> {
        let mut due: Vec<DueTimer> = self
            .timers
            .iter()
            .filter(|(_, _, t)| t.is_armed() && t.next_deadline <= now)
            .map(|(contract, seq, t)| DueTimer {
                contract: *contract,
                deadline: t.next_deadline,
                seq: *seq,
            })
            .collect();
        // Stable: equal deadlines keep creation order
        due.sort_by_key(|d| d.deadline);
        due
    }

    /// Apply the re-arm policy to a timer that just fired
    pub fn fire(&mut self, contract: ContractId) {
        let Some(pos) = self.timers.iter().position(|(id, _, _)| *id == contract) else {
            return;
        };
        let timer = &mut self.timers[pos].2;
        timer.fire();
        if !timer.is_armed() {
            self.timers.remove(pos);
            self.spent.push(contract);
        }
    }

    /// Whether a oneshot has fired and not been released yet
    pub fn is_spent(&self, contract: ContractId) -> bool {
        self.spent.contains(&contract)
    }

    /// Forget spent oneshots for which `in_use` is false and return them
    pub fn release_spent(
        &mut self,
        mut in_use: impl FnMut(ContractId) -> bool,
    ) -> Vec<ContractId> {
        let mut released = Vec::new();
        self.spent.retain(|contract| {
            if in_use(*contract) {
                true
            } else {
                released.push(*contract);
                false
            }
        });
        released
    }

    /// Earliest deadline among armed timers
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers
            .iter()
            .filter(|(_, _, t)| t.is_armed())
            .map(|(_, _, t)| t.next_deadline)
            .min()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
