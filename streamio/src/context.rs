//! Stream context: the bridge between the engine callback and the application
//!
//! A [`StreamContext`] owns one engine stream and up to two
//! [`DirectionChannel`]s. The engine thread runs the stream callback once
//! per period: captured input is queued as timestamped chunks and the
//! output period is filled from queued chunks, with silence once the output
//! queue has been quit and drained.
//!
//! The callback blocks on the queues when the input queue is full or the
//! output queue is empty. A slow application therefore stalls the engine
//! thread and may cause audible glitches; bound the queues and keep the
//! application side ahead of the device.

use crate::{
    channel::DirectionChannel,
    chunk::Chunk,
    config::{validate_pair, Direction, StreamConfig},
    engine::{
        AudioEngine, CallbackData, CallbackResult, EngineCallback, EngineStream, EngineStreamParams,
    },
    error::{Error, Result},
    status::StatusMailbox,
};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// How [`StreamContext::stop`] ends the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Stop now, discarding frames not yet played
    Abort,
    /// Play everything already queued, then stop
    Drain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Stopped,
    Running,
    Closed,
}

/// Set once by the callback when the output direction has played out
#[derive(Debug, Default)]
struct DrainLatch {
    drained: Mutex<bool>,
    cond: Condvar,
}

impl DrainLatch {
    fn set(&self) {
        let mut drained = self.drained.lock().unwrap_or_else(PoisonError::into_inner);
        if !*drained {
            *drained = true;
            self.cond.notify_all();
        }
    }

    fn wait(&self) {
        let mut drained = self.drained.lock().unwrap_or_else(PoisonError::into_inner);
        while !*drained {
            drained = self
                .cond
                .wait(drained)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// The per-period work done on the engine thread.
///
/// Holds clones of the context's channels and shared state so it can be
/// moved into the engine callback.
struct StreamCallback {
    input: Option<DirectionChannel>,
    output: Option<DirectionChannel>,
    input_latency: Arc<AtomicU64>,
    status: Arc<StatusMailbox>,
    drained: Arc<DrainLatch>,
}

impl StreamCallback {
    fn process(&self, data: CallbackData<'_>) -> CallbackResult {
        self.status.post_flags(data.status);

        let input_done = match (&self.input, data.input) {
            (Some(channel), Some(src)) => {
                let timestamp = if data.time.input_adc_time > 0.0 {
                    data.time.input_adc_time
                } else {
                    // Some engines never fill in the capture time
                    data.time.current_time - f64::from_bits(self.input_latency.load(Ordering::Relaxed))
                };
                channel.capture(src, data.frame_count, timestamp);
                false
            }
            (Some(_), None) => false,
            (None, _) => true,
        };

        let output_done = match (&self.output, data.output) {
            (Some(channel), Some(dst)) => {
                let outcome = channel.render(dst, data.frame_count);
                if outcome.finished {
                    self.drained.set();
                }
                outcome.finished
            }
            (Some(_), None) => false,
            (None, Some(dst)) => {
                dst.fill(0);
                true
            }
            (None, None) => true,
        };

        if input_done && output_done {
            CallbackResult::Complete
        } else {
            CallbackResult::Continue
        }
    }
}

/// A session streaming chunks to and from one engine stream
pub struct StreamContext {
    input: Option<DirectionChannel>,
    output: Option<DirectionChannel>,
    sample_rate: u32,
    input_latency: Arc<AtomicU64>,
    status: Arc<StatusMailbox>,
    drained: Arc<DrainLatch>,
    stream: Mutex<Box<dyn EngineStream>>,
    state: StreamState,
}

impl StreamContext {
    /// Validate the configs and open an engine stream serving them.
    ///
    /// At least one direction must be given; with both, their sample rates
    /// must match. The stream is opened stopped.
    pub fn open<E: AudioEngine>(
        engine: &E,
        input: Option<StreamConfig>,
        output: Option<StreamConfig>,
    ) -> Result<Self> {
        let sample_rate = validate_pair(input.as_ref(), output.as_ref())?;

        info!("{}", engine.name());
        if let Some(ref config) = input {
            info!("Input {}", config);
        }
        if let Some(ref config) = output {
            info!("Output {}", config);
        }

        let frames_per_buffer = input
            .as_ref()
            .and_then(|c| c.frames_per_buffer)
            .or_else(|| output.as_ref().and_then(|c| c.frames_per_buffer));
        let params = EngineStreamParams {
            input: input.clone(),
            output: output.clone(),
            sample_rate,
            frames_per_buffer,
        };

        let input = input.map(DirectionChannel::new);
        let output = output.map(DirectionChannel::new);
        let input_latency = Arc::new(AtomicU64::new(0f64.to_bits()));
        let status = Arc::new(StatusMailbox::new());
        let drained = Arc::new(DrainLatch::default());

        let callback = StreamCallback {
            input: input.clone(),
            output: output.clone(),
            input_latency: input_latency.clone(),
            status: status.clone(),
            drained: drained.clone(),
        };
        let callback: EngineCallback = Arc::new(move |data: CallbackData<'_>| callback.process(data));
        let stream = engine.open_stream(&params, callback)?;

        let stream_info = stream.info();
        input_latency.store(stream_info.input_latency.to_bits(), Ordering::Relaxed);
        debug!(
            "Stream opened at {} Hz: input latency {:.4}s, output latency {:.4}s",
            stream_info.sample_rate, stream_info.input_latency, stream_info.output_latency
        );

        Ok(Self {
            input,
            output,
            sample_rate,
            input_latency,
            status,
            drained,
            stream: Mutex::new(Box::new(stream)),
            state: StreamState::Stopped,
        })
    }

    fn engine_stream(&mut self) -> &mut dyn EngineStream {
        self.stream
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
    }

    /// Start the engine stream
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            StreamState::Closed => Err(Error::StreamClosed),
            StreamState::Running => Ok(()),
            StreamState::Stopped => {
                self.engine_stream().start()?;
                self.state = StreamState::Running;
                Ok(())
            }
        }
    }

    /// Stop and close the engine stream. The context cannot be restarted.
    pub fn stop(&mut self, mode: StopMode) -> Result<()> {
        if self.state == StreamState::Closed {
            return Err(Error::StreamClosed);
        }
        let was_running = self.state == StreamState::Running;
        self.state = StreamState::Closed;

        // A callback blocked on a queue would keep the engine from stopping
        self.quit();
        let stopped = match mode {
            StopMode::Abort => self.engine_stream().abort(),
            StopMode::Drain => {
                if was_running && self.output.is_some() {
                    debug!("Draining queued output");
                    self.drained.wait();
                }
                self.engine_stream().stop()
            }
        };
        let closed = self.engine_stream().close();
        stopped.and(closed)
    }

    /// Release application threads blocked in `pull_input_chunk`/`push_output_chunk`
    pub fn quit(&self) {
        if let Some(ref channel) = self.input {
            channel.quit();
        }
        if let Some(ref channel) = self.output {
            channel.quit();
        }
    }

    /// Read `num_bytes` of captured audio.
    ///
    /// Blocks until enough data arrived or the input was quit. A short chunk
    /// holds whatever remained; an empty chunk marks the end of the stream.
    pub fn pull_input_chunk(&self, num_bytes: usize) -> Result<Chunk> {
        let channel = self
            .input
            .as_ref()
            .ok_or(Error::DirectionNotConfigured(Direction::Input))?;
        Ok(channel.pull(num_bytes))
    }

    /// Queue audio for playback, blocking while the output queue is full.
    ///
    /// Returns `Ok(false)` when the output has been quit and the chunk was dropped.
    pub fn push_output_chunk(&self, chunk: Chunk) -> Result<bool> {
        let channel = self
            .output
            .as_ref()
            .ok_or(Error::DirectionNotConfigured(Direction::Output))?;
        Ok(channel.push(chunk))
    }

    /// Take the latest engine status report.
    ///
    /// With `close_on_error` set for `direction` the report is returned to
    /// the caller; otherwise it is logged and discarded. Either way it is cleared.
    /// A direction the stream does not have leaves the report in place.
    pub fn fetch_and_clear_error(&self, direction: Direction) -> Option<String> {
        let config = self.config(direction)?;
        let report = self.status.take()?;
        if config.close_on_error {
            Some(report)
        } else {
            warn!("AudioIO: {}", report);
            None
        }
    }

    /// Config for one direction
    pub fn config(&self, direction: Direction) -> Option<&StreamConfig> {
        match direction {
            Direction::Input => self.input_config(),
            Direction::Output => self.output_config(),
        }
    }

    /// Input direction config
    pub fn input_config(&self) -> Option<&StreamConfig> {
        self.input.as_ref().map(DirectionChannel::config)
    }

    /// Output direction config
    pub fn output_config(&self) -> Option<&StreamConfig> {
        self.output.as_ref().map(DirectionChannel::config)
    }

    /// Whether the stream captures input
    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Whether the stream plays output
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Shared sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Input latency reported by the engine, in seconds
    pub fn input_latency(&self) -> f64 {
        f64::from_bits(self.input_latency.load(Ordering::Relaxed))
    }

    /// Current engine stream time in seconds
    pub fn stream_time(&self) -> f64 {
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .time()
    }

    /// Whether the engine is running
    pub fn is_running(&self) -> bool {
        self.state == StreamState::Running
    }

    /// Whether the stream has been stopped for good
    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }
}

impl Drop for StreamContext {
    fn drop(&mut self) {
        self.quit();
        if self.state != StreamState::Closed {
            self.state = StreamState::Closed;
            let stream = self.engine_stream();
            if let Err(e) = stream.abort().and(stream.close()) {
                warn!("Failed to close stream: {}", e);
            }
        }
    }
}
