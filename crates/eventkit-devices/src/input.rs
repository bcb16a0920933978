//! Navigation input
//!
//! Raw key transitions are classified into press, short, long, repeat and
//! release events. A key held past the long-press threshold emits `Long`
//! once, then `Repeat` at a fixed interval until released; releasing
//! before the threshold emits `Short`. Only one key is tracked at a time:
//! pressing a second key releases the first.
//!
//! The back key is routed to its own contract so a script can bind "exit"
//! without filtering every navigation event.

use std::time::{Duration, Instant};

use eventkit_core::{Contract, Scheduler, SignalSource};
use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, DeviceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKey {
    Up,
    Down,
    Left,
    Right,
    Ok,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Press,
    Release,
    Short,
    Long,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    pub key: InputKey,
    pub kind: InputType,
    /// Shared by every event of one press cycle
    pub sequence: u32,
}

/// Long-press and auto-repeat thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputTiming {
    pub long_press_ms: u64,
    pub repeat_ms: u64,
}

impl Default for InputTiming {
    fn default() -> Self {
        Self {
            long_press_ms: 300,
            repeat_ms: 150,
        }
    }
}

impl InputTiming {
    pub fn validate(&self) -> DeviceResult<()> {
        if self.long_press_ms == 0 {
            return Err(DeviceError::InvalidParameter {
                parameter: "long press threshold",
                reason: "must be > 0".to_string(),
            });
        }
        if self.repeat_ms == 0 {
            return Err(DeviceError::InvalidParameter {
                parameter: "repeat interval",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    fn repeat(&self) -> Duration {
        Duration::from_millis(self.repeat_ms)
    }
}

#[derive(Debug, Clone, Copy)]
struct Held {
    key: InputKey,
    since: Instant,
    long_fired: bool,
    last_repeat: Instant,
    sequence: u32,
}

/// Press/release classifier, independent of any loop
#[derive(Debug, Clone)]
pub struct InputClassifier {
    timing: InputTiming,
    held: Option<Held>,
    next_sequence: u32,
}

impl InputClassifier {
    pub fn new(timing: InputTiming) -> Self {
        Self {
            timing,
            held: None,
            next_sequence: 0,
        }
    }

    pub fn held(&self) -> Option<InputKey> {
        self.held.map(|h| h.key)
    }

    pub fn press(&mut self, key: InputKey, now: Instant) -> Vec<InputEvent> {
        let mut events = Vec::new();
        match self.held {
            Some(held) if held.key == key => return events,
            Some(held) => events.extend(self.release(held.key, now)),
            None => {}
        }

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.held = Some(Held {
            key,
            since: now,
            long_fired: false,
            last_repeat: now,
            sequence,
        });
        events.push(InputEvent {
            key,
            kind: InputType::Press,
            sequence,
        });
        events
    }

    pub fn release(&mut self, key: InputKey, _now: Instant) -> Vec<InputEvent> {
        let held = match self.held {
            Some(held) if held.key == key => held,
            _ => return Vec::new(),
        };
        self.held = None;

        let event = |kind| InputEvent {
            key,
            kind,
            sequence: held.sequence,
        };
        if held.long_fired {
            vec![event(InputType::Release)]
        } else {
            vec![event(InputType::Short), event(InputType::Release)]
        }
    }

    /// Advance time for a held key; emits `Long` or `Repeat` when due
    pub fn tick(&mut self, now: Instant) -> Option<InputEvent> {
        let timing = self.timing;
        let held = self.held.as_mut()?;
        let elapsed = now.saturating_duration_since(held.since);

        let kind = if !held.long_fired && elapsed >= timing.long_press() {
            held.long_fired = true;
            InputType::Long
        } else if held.long_fired
            && now.saturating_duration_since(held.last_repeat) >= timing.repeat()
        {
            InputType::Repeat
        } else {
            return None;
        };

        held.last_repeat = now;
        Some(InputEvent {
            key: held.key,
            kind,
            sequence: held.sequence,
        })
    }
}

/// Contracts an [`InputDevice`] delivers on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputContracts {
    /// Every key except back
    pub navigation: Contract<InputEvent>,
    /// Back key only
    pub back: Contract<InputEvent>,
}

/// Driver half of the navigation input
#[derive(Debug)]
pub struct InputDevice {
    classifier: InputClassifier,
    navigation: SignalSource<InputEvent>,
    back: SignalSource<InputEvent>,
}

impl InputDevice {
    pub fn attach(
        scheduler: &mut Scheduler,
        timing: InputTiming,
    ) -> DeviceResult<(InputContracts, Self)> {
        timing.validate()?;
        let (navigation, navigation_source) = scheduler.signal::<InputEvent>()?.into_parts();
        let (back, back_source) = scheduler.signal::<InputEvent>()?.into_parts();
        tracing::debug!("Input attached: navigation {}, back {}", navigation, back);

        Ok((
            InputContracts { navigation, back },
            Self {
                classifier: InputClassifier::new(timing),
                navigation: navigation_source,
                back: back_source,
            },
        ))
    }

    pub fn press(&mut self, key: InputKey) -> DeviceResult<usize> {
        self.press_at(key, Instant::now())
    }

    pub fn release(&mut self, key: InputKey) -> DeviceResult<usize> {
        self.release_at(key, Instant::now())
    }

    /// Emit any due long-press or repeat event
    pub fn poll(&mut self) -> DeviceResult<usize> {
        self.poll_at(Instant::now())
    }

    pub fn press_at(&mut self, key: InputKey, now: Instant) -> DeviceResult<usize> {
        let events = self.classifier.press(key, now);
        self.deliver(events)
    }

    pub fn release_at(&mut self, key: InputKey, now: Instant) -> DeviceResult<usize> {
        let events = self.classifier.release(key, now);
        self.deliver(events)
    }

    pub fn poll_at(&mut self, now: Instant) -> DeviceResult<usize> {
        let events = self.classifier.tick(now).into_iter().collect();
        self.deliver(events)
    }

    /// Route events to their contract. Returns how many were delivered.
    fn deliver(&self, events: Vec<InputEvent>) -> DeviceResult<usize> {
        if self.navigation.is_closed() {
            return Err(DeviceError::Detached("input".to_string()));
        }

        let mut delivered = 0;
        for event in events {
            let source = match event.key {
                InputKey::Back => &self.back,
                _ => &self.navigation,
            };
            if source.fire(event) {
                delivered += 1;
            }
        }
        Ok(delivered)
    }
}
