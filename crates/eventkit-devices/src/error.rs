//! Error types for device adapters

use eventkit_core::LoopError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    /// Adapter timing or size parameters are unusable
    #[error("Invalid {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    /// The owning event loop rejected the adapter's contracts
    #[error(transparent)]
    Loop(#[from] LoopError),

    /// The loop was torn down; nothing will receive further events
    #[error("Device {0} is detached from its event loop")]
    Detached(String),

    /// Reading from the underlying transport failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DeviceResult<T> = Result<T, DeviceError>;
