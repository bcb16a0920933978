//! GPIO edge interrupts
//!
//! The driver half receives raw pin levels (from a polling thread or an
//! interrupt shim) and fires a signal only on the edges the caller asked
//! for. Levels that do not change the pin state are ignored.

use std::time::Instant;

use eventkit_core::{Contract, Scheduler, SignalSource};
use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, DeviceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Rising,
    Falling,
}

/// Which edges raise an interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeTrigger {
    #[default]
    Rising,
    Falling,
    Both,
}

impl EdgeTrigger {
    pub fn matches(&self, edge: Edge) -> bool {
        matches!(
            (self, edge),
            (EdgeTrigger::Both, _)
                | (EdgeTrigger::Rising, Edge::Rising)
                | (EdgeTrigger::Falling, Edge::Falling)
        )
    }
}

/// Item delivered on a GPIO contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioEvent {
    pub pin: u8,
    pub edge: Edge,
    /// When the level change was observed, not when it was dispatched
    pub at: Instant,
}

/// Driver half of a GPIO interrupt
#[derive(Debug)]
pub struct GpioInterrupt {
    pin: u8,
    trigger: EdgeTrigger,
    level: Level,
    source: SignalSource<GpioEvent>,
    dropped: u64,
}

impl GpioInterrupt {
    /// Register an interrupt on `pin`, starting at `initial` level.
    ///
    /// Returns the contract to subscribe to and the driver half to feed
    /// levels into.
    pub fn attach(
        scheduler: &mut Scheduler,
        pin: u8,
        trigger: EdgeTrigger,
        initial: Level,
    ) -> DeviceResult<(Contract<GpioEvent>, Self)> {
        let (contract, source) = scheduler.signal::<GpioEvent>()?.into_parts();
        tracing::debug!("GPIO {} attached ({:?} edges) as {}", pin, trigger, contract);
        Ok((
            contract,
            Self {
                pin,
                trigger,
                level: initial,
                source,
                dropped: 0,
            },
        ))
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Interrupts lost because the loop fell behind
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Feed the current pin level.
    ///
    /// Returns the edge if one was raised and delivered to the loop.
    pub fn set_level(&mut self, level: Level) -> DeviceResult<Option<Edge>> {
        self.set_level_at(level, Instant::now())
    }

    pub fn set_level_at(&mut self, level: Level, at: Instant) -> DeviceResult<Option<Edge>> {
        if self.source.is_closed() {
            return Err(DeviceError::Detached(format!("gpio {}", self.pin)));
        }
        if level == self.level {
            return Ok(None);
        }

        let edge = match level {
            Level::High => Edge::Rising,
            Level::Low => Edge::Falling,
        };
        self.level = level;

        if !self.trigger.matches(edge) {
            return Ok(None);
        }
        if self.source.fire(GpioEvent {
            pin: self.pin,
            edge,
            at,
        }) {
            Ok(Some(edge))
        } else {
            self.dropped += 1;
            Ok(None)
        }
    }
}
