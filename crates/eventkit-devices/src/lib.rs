//! # EventKit Devices
//!
//! Adapters that turn hardware-style producers into loop signals. Each
//! adapter is created against a [`Scheduler`](eventkit_core::Scheduler),
//! hands back the contract(s) to subscribe to, and a `Send` driver half
//! that an interrupt shim or reader thread feeds.
//!
//! - [`gpio`]: edge interrupts derived from pin level changes
//! - [`input`]: navigation keys with short/long/repeat classification
//! - [`serial`]: line-oriented serial receiver

pub mod error;
pub mod gpio;
pub mod input;
pub mod serial;

pub use error::{DeviceError, DeviceResult};
pub use gpio::{Edge, EdgeTrigger, GpioEvent, GpioInterrupt, Level};
pub use input::{
    InputClassifier, InputContracts, InputDevice, InputEvent, InputKey, InputTiming, InputType,
};
pub use serial::{LineAssembler, SerialLines};
