//! CPAL audio engine implementation
//!
//! CPAL has no duplex streams, so a stream with both directions is backed by
//! one input and one output CPAL stream sharing the callback. Each CPAL
//! thread invokes the callback with only its own buffer.

use crate::{
    config::{Direction, SampleFormat, StreamConfig},
    engine::{
        AudioEngine, CallbackData, CallbackResult, CallbackTimeInfo, DeviceInfo, EngineCallback,
        EngineStream, EngineStreamInfo, EngineStreamParams,
    },
    error::{Error, Result},
    status::StatusFlags,
};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, Device, SampleRate, Stream,
};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// State shared between the CPAL threads of one stream
struct SharedState {
    callback: EngineCallback,
    origin: Instant,
    complete: AtomicBool,
    pending_status: AtomicU32,
}

impl SharedState {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn take_status(&self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.pending_status.swap(0, Ordering::AcqRel))
    }

    fn flag(&self, flags: StatusFlags) {
        self.pending_status.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    fn finish_if(&self, result: CallbackResult) {
        if result == CallbackResult::Complete {
            self.complete.store(true, Ordering::Release);
        }
    }
}

/// CPAL stream wrapper
pub struct CpalStream {
    // Dropping the CPAL streams closes them
    streams: Option<Vec<Stream>>,
    shared: Arc<SharedState>,
    info: EngineStreamInfo,
}

// CPAL streams are only driven through play/pause from the owning thread
unsafe impl Send for CpalStream {}

impl CpalStream {
    fn each_stream<F>(&self, mut op: F) -> Result<()>
    where
        F: FnMut(&Stream) -> Result<()>,
    {
        let streams = self.streams.as_ref().ok_or(Error::StreamClosed)?;
        for stream in streams {
            op(stream)?;
        }
        Ok(())
    }
}

impl EngineStream for CpalStream {
    fn start(&mut self) -> Result<()> {
        self.each_stream(|stream| {
            stream
                .play()
                .map_err(|e| Error::StreamStart(e.to_string()))
        })
    }

    fn stop(&mut self) -> Result<()> {
        self.each_stream(|stream| {
            stream
                .pause()
                .map_err(|e| Error::StreamStop(e.to_string()))
        })
    }

    fn abort(&mut self) -> Result<()> {
        self.complete_now();
        self.stop()
    }

    fn close(&mut self) -> Result<()> {
        self.complete_now();
        self.streams.take();
        Ok(())
    }

    fn info(&self) -> EngineStreamInfo {
        self.info
    }

    fn time(&self) -> f64 {
        self.shared.now()
    }
}

impl CpalStream {
    fn complete_now(&self) {
        self.shared.complete.store(true, Ordering::Release);
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.streams.take();
    }
}

/// CPAL-based audio engine
pub struct CpalEngine {
    host: cpal::Host,
}

impl CpalEngine {
    /// Create an engine on the platform's default host
    pub fn new() -> Result<Self> {
        Ok(Self {
            host: cpal::default_host(),
        })
    }

    fn all_devices(&self) -> Result<Vec<Device>> {
        Ok(self
            .host
            .devices()
            .map_err(|e| Error::EngineInit(format!("Failed to enumerate devices: {}", e)))?
            .collect())
    }

    /// Pick the configured device, falling back to the default one
    fn resolve_device(&self, direction: Direction, device_id: Option<usize>) -> Result<Device> {
        if let Some(id) = device_id {
            if let Some(device) = self.all_devices()?.into_iter().nth(id) {
                return Ok(device);
            }
        }
        let default = match direction {
            Direction::Input => self.host.default_input_device(),
            Direction::Output => self.host.default_output_device(),
        };
        default.ok_or_else(|| Error::DeviceNotFound("No default device".to_string()))
    }

    /// Check channels, format and rate against what the device supports
    fn check_support(
        device: &Device,
        direction: Direction,
        config: &StreamConfig,
        format: cpal::SampleFormat,
        sample_rate: u32,
    ) -> Result<()> {
        let ranges: Vec<cpal::SupportedStreamConfigRange> = match direction {
            Direction::Input => device
                .supported_input_configs()
                .map_err(|e| Error::FormatNotSupported(e.to_string()))?
                .collect(),
            Direction::Output => device
                .supported_output_configs()
                .map_err(|e| Error::FormatNotSupported(e.to_string()))?
                .collect(),
        };

        let max_channels = ranges.iter().map(|r| r.channels()).max().unwrap_or(0);
        if config.channel_count > max_channels {
            return Err(Error::ChannelCountExceeded {
                requested: config.channel_count,
                max: max_channels,
            });
        }

        let supported = ranges.iter().any(|r| {
            r.channels() == config.channel_count
                && r.sample_format() == format
                && r.min_sample_rate().0 <= sample_rate
                && sample_rate <= r.max_sample_rate().0
        });
        if !supported {
            return Err(Error::FormatNotSupported(format!(
                "{} channels of {} at {} Hz",
                config.channel_count, config.sample_format, sample_rate
            )));
        }
        Ok(())
    }

    fn stream_config(config: &StreamConfig, params: &EngineStreamParams) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: config.channel_count,
            sample_rate: SampleRate(params.sample_rate),
            buffer_size: match params.frames_per_buffer {
                Some(frames) => BufferSize::Fixed(frames),
                None => BufferSize::Default,
            },
        }
    }

    fn build_input(
        &self,
        config: &StreamConfig,
        params: &EngineStreamParams,
        shared: &Arc<SharedState>,
    ) -> Result<Stream> {
        let device = self.resolve_device(Direction::Input, config.device_id)?;
        info!("Input device name is {}", device.name().unwrap_or_default());
        let format = cpal_sample_format(config.sample_format)?;
        Self::check_support(&device, Direction::Input, config, format, params.sample_rate)?;

        let channels = config.channel_count as usize;
        let data_state = shared.clone();
        let error_state = shared.clone();
        device
            .build_input_stream_raw(
                &Self::stream_config(config, params),
                format,
                move |data: &cpal::Data, info: &cpal::InputCallbackInfo| {
                    if data_state.complete.load(Ordering::Acquire) {
                        return;
                    }
                    let current_time = data_state.now();
                    let stamp = info.timestamp();
                    let input_adc_time = stamp
                        .callback
                        .duration_since(&stamp.capture)
                        .map_or(0.0, |delay| (current_time - delay.as_secs_f64()).max(0.0));
                    let result = (data_state.callback)(CallbackData {
                        input: Some(data.bytes()),
                        output: None,
                        frame_count: data.len() / channels,
                        time: CallbackTimeInfo {
                            input_adc_time,
                            output_dac_time: 0.0,
                            current_time,
                        },
                        status: data_state.take_status(),
                    });
                    data_state.finish_if(result);
                },
                move |err| {
                    warn!("Input stream error: {}", err);
                    error_state.flag(StatusFlags::INPUT_OVERFLOW);
                },
                None,
            )
            .map_err(|e| Error::StreamOpen(e.to_string()))
    }

    fn build_output(
        &self,
        config: &StreamConfig,
        params: &EngineStreamParams,
        shared: &Arc<SharedState>,
    ) -> Result<Stream> {
        let device = self.resolve_device(Direction::Output, config.device_id)?;
        info!("Output device name is {}", device.name().unwrap_or_default());
        let format = cpal_sample_format(config.sample_format)?;
        Self::check_support(&device, Direction::Output, config, format, params.sample_rate)?;

        let channels = config.channel_count as usize;
        let data_state = shared.clone();
        let error_state = shared.clone();
        device
            .build_output_stream_raw(
                &Self::stream_config(config, params),
                format,
                move |data: &mut cpal::Data, info: &cpal::OutputCallbackInfo| {
                    let frame_count = data.len() / channels;
                    let bytes = data.bytes_mut();
                    if data_state.complete.load(Ordering::Acquire) {
                        bytes.fill(0);
                        return;
                    }
                    let current_time = data_state.now();
                    let stamp = info.timestamp();
                    let output_dac_time = stamp
                        .playback
                        .duration_since(&stamp.callback)
                        .map_or(0.0, |ahead| current_time + ahead.as_secs_f64());
                    let result = (data_state.callback)(CallbackData {
                        input: None,
                        output: Some(bytes),
                        frame_count,
                        time: CallbackTimeInfo {
                            input_adc_time: 0.0,
                            output_dac_time,
                            current_time,
                        },
                        status: data_state.take_status(),
                    });
                    data_state.finish_if(result);
                },
                move |err| {
                    warn!("Output stream error: {}", err);
                    error_state.flag(StatusFlags::OUTPUT_UNDERFLOW);
                },
                None,
            )
            .map_err(|e| Error::StreamOpen(e.to_string()))
    }
}

impl AudioEngine for CpalEngine {
    type Stream = CpalStream;

    fn name(&self) -> String {
        format!("CPAL host {}", self.host.id().name())
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        let devices = self
            .all_devices()?
            .into_iter()
            .enumerate()
            .map(|(index, device)| {
                let max_input_channels = device
                    .supported_input_configs()
                    .map(|ranges| ranges.map(|r| r.channels()).max().unwrap_or(0))
                    .unwrap_or(0);
                let max_output_channels = device
                    .supported_output_configs()
                    .map(|ranges| ranges.map(|r| r.channels()).max().unwrap_or(0))
                    .unwrap_or(0);
                let default_sample_rate = device
                    .default_output_config()
                    .or_else(|_| device.default_input_config())
                    .map(|c| c.sample_rate().0)
                    .unwrap_or(0);
                DeviceInfo {
                    index,
                    name: device.name().unwrap_or_else(|_| "<unknown>".to_string()),
                    max_input_channels,
                    max_output_channels,
                    default_sample_rate,
                }
            })
            .collect();
        Ok(devices)
    }

    fn open_stream(&self, params: &EngineStreamParams, callback: EngineCallback) -> Result<Self::Stream> {
        let shared = Arc::new(SharedState {
            callback,
            origin: Instant::now(),
            complete: AtomicBool::new(false),
            pending_status: AtomicU32::new(0),
        });

        let mut streams = Vec::new();
        if let Some(ref config) = params.input {
            streams.push(self.build_input(config, params, &shared)?);
        }
        if let Some(ref config) = params.output {
            streams.push(self.build_output(config, params, &shared)?);
        }

        // One period of buffering is the best estimate CPAL allows before running
        let period = params
            .frames_per_buffer
            .map_or(0.0, |frames| frames as f64 / params.sample_rate as f64);
        let info = EngineStreamInfo {
            input_latency: if params.input.is_some() { period } else { 0.0 },
            output_latency: if params.output.is_some() { period } else { 0.0 },
            sample_rate: params.sample_rate,
        };

        Ok(CpalStream {
            streams: Some(streams),
            shared,
            info,
        })
    }
}

/// Map a sample format onto CPAL's; packed 24-bit samples have no CPAL equivalent
fn cpal_sample_format(format: SampleFormat) -> Result<cpal::SampleFormat> {
    match format {
        SampleFormat::Float32 => Ok(cpal::SampleFormat::F32),
        SampleFormat::Int8 => Ok(cpal::SampleFormat::I8),
        SampleFormat::Int16 => Ok(cpal::SampleFormat::I16),
        SampleFormat::Int32 => Ok(cpal::SampleFormat::I32),
        SampleFormat::Int24 => Err(Error::FormatNotSupported(
            "packed 24-bit samples are not available through CPAL".to_string(),
        )),
    }
}
