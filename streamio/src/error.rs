//! Error types for the streamio library

use crate::config::Direction;
use thiserror::Error;

/// Main error type for streamio operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration rejected before any engine resource was touched
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The audio engine could not be initialised
    #[error("Could not initialize audio engine: {0}")]
    EngineInit(String),

    /// No device matched the request and no default device exists
    #[error("No device available: {0}")]
    DeviceNotFound(String),

    /// Requested more channels than the device provides
    #[error("Channel count {requested} exceeds maximum number of channels for device ({max})")]
    ChannelCountExceeded {
        /// Channels requested by the configuration
        requested: u16,
        /// Channels the device supports
        max: u16,
    },

    /// Format/rate/channel combination rejected by the device
    #[error("Format not supported: {0}")]
    FormatNotSupported(String),

    /// The engine failed to open the stream
    #[error("Could not open stream: {0}")]
    StreamOpen(String),

    /// The engine failed to start the stream
    #[error("Could not start stream: {0}")]
    StreamStart(String),

    /// The engine failed to stop the stream
    #[error("Could not stop stream: {0}")]
    StreamStop(String),

    /// The stream has been stopped and cannot be used again
    #[error("Stream has been closed")]
    StreamClosed,

    /// Operation targets a direction the stream was not opened with
    #[error("{0} is not configured for this stream")]
    DirectionNotConfigured(Direction),

    /// Session file could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, Error>;
