//! # EventKit
//!
//! A cooperative, single-threaded event loop for script-style programs:
//! - Oneshot and periodic timers
//! - Bounded FIFO queues fed from the loop or from producer threads
//! - External signals (GPIO edges, navigation keys, serial lines)
//! - Subscriptions with explicitly threaded state
//!
//! ## Architecture
//!
//! EventKit is organized as a workspace with multiple crates:
//!
//! 1. **eventkit-core** - Contracts, timers, queues, signals, registry, dispatcher
//! 2. **eventkit-devices** - Signal adapters for GPIO, input and serial producers
//! 3. **eventkit-settings** - Settings file handling
//! 4. **eventkit** - Demo binary, logging setup and re-exports

pub mod demo;

pub use eventkit_core::{
    CallbackResult, Contract, ContractId, ContractKind, EventLoop, LoopConfig, LoopError,
    LoopState, Queue, QueueError, QueueFullPolicy, QueueSender, RunSummary, Scheduler, Signal,
    SignalSource, StopHandle, SubscriptionHandle, SubscriptionId, TimerMode, Turn,
};

pub use eventkit_devices::{
    DeviceError, Edge, EdgeTrigger, GpioEvent, GpioInterrupt, InputContracts, InputDevice,
    InputEvent, InputKey, InputTiming, InputType, Level, SerialLines,
};

pub use eventkit_settings::{LogFormat, LoggingSettings, Settings, SettingsError, SettingsStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging from the logging settings
///
/// Sets up structured logging with:
/// - `RUST_LOG` support, falling back to the configured level
/// - Pretty multi-line output or one JSON object per line
/// - Thread ids, so producer threads are told apart from the loop
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", settings.level, e))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match settings.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stdout)
                    .with_thread_ids(true)
                    .with_current_span(true),
            )
            .try_init()?,
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .pretty(),
            )
            .try_init()?,
    }

    Ok(())
}
