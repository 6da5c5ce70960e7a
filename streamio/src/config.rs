//! Stream configuration types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stream direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Capture from the device
    Input,
    /// Playback to the device
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "Input"),
            Direction::Output => write!(f, "Output"),
        }
    }
}

/// Interleaved sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// 32-bit float
    Float32,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 24-bit signed integer, packed in 3 bytes
    Int24,
    /// 32-bit signed integer
    Int32,
}

impl SampleFormat {
    /// Parse the numeric format code (1 = float32, otherwise the bit width)
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            1 => Ok(SampleFormat::Float32),
            8 => Ok(SampleFormat::Int8),
            16 => Ok(SampleFormat::Int16),
            24 => Ok(SampleFormat::Int24),
            32 => Ok(SampleFormat::Int32),
            other => Err(Error::InvalidConfig(format!("Invalid sampleFormat {}", other))),
        }
    }

    /// Numeric format code
    pub fn code(&self) -> u32 {
        match self {
            SampleFormat::Float32 => 1,
            SampleFormat::Int8 => 8,
            SampleFormat::Int16 => 16,
            SampleFormat::Int24 => 24,
            SampleFormat::Int32 => 32,
        }
    }

    /// Bits per sample
    pub fn sample_bits(&self) -> u32 {
        match self {
            SampleFormat::Float32 => 32,
            SampleFormat::Int8 => 8,
            SampleFormat::Int16 => 16,
            SampleFormat::Int24 => 24,
            SampleFormat::Int32 => 32,
        }
    }

    /// Bytes per sample
    pub fn bytes_per_sample(&self) -> usize {
        self.sample_bits() as usize / 8
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::Float32 => "float32",
            SampleFormat::Int8 => "int8",
            SampleFormat::Int16 => "int16",
            SampleFormat::Int24 => "int24",
            SampleFormat::Int32 => "int32",
        };
        f.write_str(name)
    }
}

/// Byte geometry of one direction, used for size and time arithmetic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLayout {
    /// Interleaved channels per frame
    pub channel_count: u16,
    /// Bytes per individual sample
    pub bytes_per_sample: usize,
    /// Frames per second
    pub sample_rate: u32,
}

impl FrameLayout {
    /// Bytes in one frame
    pub fn bytes_per_frame(&self) -> usize {
        self.channel_count as usize * self.bytes_per_sample
    }

    /// Bytes needed for `frame_count` frames
    pub fn bytes_for_frames(&self, frame_count: usize) -> usize {
        frame_count * self.bytes_per_frame()
    }

    /// Duration in seconds covered by `byte_offset` bytes
    pub fn seconds_for_bytes(&self, byte_offset: usize) -> f64 {
        byte_offset as f64
            / self.channel_count as f64
            / self.bytes_per_sample as f64
            / self.sample_rate as f64
    }
}

/// Parameters for one direction of a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Device index; `None` or out of range selects the default device
    pub device_id: Option<usize>,
    /// Interleaved channel count
    pub channel_count: u16,
    /// Sample encoding
    pub sample_format: SampleFormat,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Maximum queued chunks (0 = unbounded)
    pub max_queued_chunks: usize,
    /// Hand engine status reports to the caller instead of logging them
    pub close_on_error: bool,
    /// Frames per engine callback; engine default when `None`
    pub frames_per_buffer: Option<u32>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            channel_count: 2,
            sample_format: SampleFormat::Int16,
            sample_rate: 44100,
            max_queued_chunks: 2,
            close_on_error: true,
            frames_per_buffer: None,
        }
    }
}

impl StreamConfig {
    /// Create a config for the default device
    pub fn new(channel_count: u16, sample_format: SampleFormat, sample_rate: u32) -> Self {
        Self {
            channel_count,
            sample_format,
            sample_rate,
            ..Self::default()
        }
    }

    /// Select a device by index
    pub fn device_id(mut self, device_id: usize) -> Self {
        self.device_id = Some(device_id);
        self
    }

    /// Bound the chunk queue
    pub fn max_queued_chunks(mut self, max_queued_chunks: usize) -> Self {
        self.max_queued_chunks = max_queued_chunks;
        self
    }

    /// Choose whether status reports are propagated or only logged
    pub fn close_on_error(mut self, close_on_error: bool) -> Self {
        self.close_on_error = close_on_error;
        self
    }

    /// Request a fixed callback size
    pub fn frames_per_buffer(mut self, frames: u32) -> Self {
        self.frames_per_buffer = Some(frames);
        self
    }

    /// Byte geometry of this config
    pub fn layout(&self) -> FrameLayout {
        FrameLayout {
            channel_count: self.channel_count,
            bytes_per_sample: self.sample_format.bytes_per_sample(),
            sample_rate: self.sample_rate,
        }
    }

    /// Check the values that need no device to validate
    pub fn validate(&self) -> Result<()> {
        if self.channel_count == 0 {
            return Err(Error::InvalidConfig("channel count must be at least 1".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample rate must be positive".to_string()));
        }
        if self.frames_per_buffer == Some(0) {
            return Err(Error::InvalidConfig("frames per buffer must be positive".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = match self.device_id {
            Some(id) => id.to_string(),
            None => "default".to_string(),
        };
        write!(
            f,
            "options: device {}, sample rate {}, channels {}, bits per sample {}, max queue {}, close on error {}",
            device,
            self.sample_rate,
            self.channel_count,
            self.sample_format.sample_bits(),
            self.max_queued_chunks,
            if self.close_on_error { "on" } else { "off" },
        )
    }
}

/// Validate a pair of direction configs for one shared stream, returning the common rate
pub fn validate_pair(input: Option<&StreamConfig>, output: Option<&StreamConfig>) -> Result<u32> {
    match (input, output) {
        (None, None) => Err(Error::InvalidConfig(
            "Input and/or Output options must be specified".to_string(),
        )),
        (Some(input), Some(output)) => {
            input.validate()?;
            output.validate()?;
            if input.sample_rate != output.sample_rate {
                return Err(Error::InvalidConfig(
                    "Input and Output sample rates must match".to_string(),
                ));
            }
            Ok(input.sample_rate)
        }
        (Some(config), None) | (None, Some(config)) => {
            config.validate()?;
            Ok(config.sample_rate)
        }
    }
}
