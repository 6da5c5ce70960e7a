//! Audio engine abstraction
//!
//! The engine owns the realtime thread. It opens one stream serving the
//! configured directions and invokes a single callback per period with the
//! raw device buffers, timing information and status flags. Everything the
//! rest of the crate knows about devices goes through these traits, so a
//! deterministic engine can stand in for hardware.

use crate::{
    config::StreamConfig,
    error::Result,
    status::StatusFlags,
};
use std::sync::Arc;

/// Timing information for one callback, in stream seconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CallbackTimeInfo {
    /// Capture time of the first input sample, 0 when the engine cannot tell
    pub input_adc_time: f64,
    /// Time the first output sample will reach the DAC, 0 when unknown
    pub output_dac_time: f64,
    /// Stream time when the callback was invoked
    pub current_time: f64,
}

/// Arguments of one callback invocation
#[derive(Debug)]
pub struct CallbackData<'a> {
    /// Captured bytes, `None` when the stream has no input
    pub input: Option<&'a [u8]>,
    /// Bytes to render, `None` when the stream has no output
    pub output: Option<&'a mut [u8]>,
    /// Frames requested for this period
    pub frame_count: usize,
    /// Timing hints
    pub time: CallbackTimeInfo,
    /// Conditions the engine observed since the previous callback
    pub status: StatusFlags,
}

/// What the engine should do after a callback returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResult {
    /// Keep invoking the callback
    Continue,
    /// Every direction has finished; stop calling
    Complete,
}

/// Callback handed to [`AudioEngine::open_stream`].
///
/// Engines that drive input and output from separate threads may invoke it
/// concurrently, once per direction.
pub type EngineCallback = Arc<dyn Fn(CallbackData<'_>) -> CallbackResult + Send + Sync>;

/// Parameters for opening an engine stream
#[derive(Debug, Clone)]
pub struct EngineStreamParams {
    /// Input direction, if any
    pub input: Option<StreamConfig>,
    /// Output direction, if any
    pub output: Option<StreamConfig>,
    /// Rate shared by both directions
    pub sample_rate: u32,
    /// Fixed callback size, engine default when `None`
    pub frames_per_buffer: Option<u32>,
}

/// Latencies negotiated when the stream was opened
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineStreamInfo {
    /// Input latency in seconds
    pub input_latency: f64,
    /// Output latency in seconds
    pub output_latency: f64,
    /// Actual sample rate
    pub sample_rate: u32,
}

/// Device description
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Index usable as `StreamConfig::device_id`
    pub index: usize,
    /// Device name
    pub name: String,
    /// Maximum capture channels
    pub max_input_channels: u16,
    /// Maximum playback channels
    pub max_output_channels: u16,
    /// Sample rate the device prefers
    pub default_sample_rate: u32,
}

/// An opened engine stream
pub trait EngineStream: Send {
    /// Begin invoking the callback
    fn start(&mut self) -> Result<()>;

    /// Stop after buffers already handed to the device have played
    fn stop(&mut self) -> Result<()>;

    /// Stop immediately, discarding pending device buffers
    fn abort(&mut self) -> Result<()>;

    /// Release engine resources; the stream cannot be used afterwards
    fn close(&mut self) -> Result<()>;

    /// Latencies and rate of the opened stream
    fn info(&self) -> EngineStreamInfo;

    /// Current stream time in seconds
    fn time(&self) -> f64;
}

/// Audio engine that can open callback-driven streams
pub trait AudioEngine {
    /// The stream type this engine produces
    type Stream: EngineStream + 'static;

    /// Name and version of the engine
    fn name(&self) -> String;

    /// Enumerate devices
    fn devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Validate the parameters against the devices and open a stream.
    ///
    /// Fails with a construction error when a device is missing, a channel
    /// count is too large, or the format/rate combination is unsupported.
    fn open_stream(&self, params: &EngineStreamParams, callback: EngineCallback) -> Result<Self::Stream>;
}
