#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use streamio::engine::*;
use streamio::{Error, Result, StatusFlags};

/// Engine that never touches hardware; tests drive periods by hand
#[derive(Clone, Default)]
pub struct MockEngine {
    pub callback: Arc<Mutex<Option<EngineCallback>>>,
    pub events: Arc<Mutex<Vec<&'static str>>>,
    pub params: Arc<Mutex<Option<EngineStreamParams>>>,
    pub input_latency: f64,
    pub stream_time: f64,
    pub fail_open: bool,
    pub fail_start: bool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input_latency(latency: f64) -> Self {
        Self {
            input_latency: latency,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    /// Invoke the stream callback once, as the engine thread would
    pub fn run_period(
        &self,
        input: Option<&[u8]>,
        output: Option<&mut [u8]>,
        frame_count: usize,
        time: CallbackTimeInfo,
        status: StatusFlags,
    ) -> CallbackResult {
        // Never hold the lock while the callback may block on a queue
        let callback = self
            .callback
            .lock()
            .unwrap()
            .clone()
            .expect("stream not opened");
        callback(CallbackData {
            input,
            output,
            frame_count,
            time,
            status,
        })
    }
}

pub struct MockStream {
    events: Arc<Mutex<Vec<&'static str>>>,
    info: EngineStreamInfo,
    time: f64,
    fail_start: bool,
}

impl EngineStream for MockStream {
    fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(Error::StreamStart("device unplugged".to_string()));
        }
        self.events.lock().unwrap().push("start");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.events.lock().unwrap().push("stop");
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        self.events.lock().unwrap().push("abort");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.events.lock().unwrap().push("close");
        Ok(())
    }

    fn info(&self) -> EngineStreamInfo {
        self.info
    }

    fn time(&self) -> f64 {
        self.time
    }
}

impl AudioEngine for MockEngine {
    type Stream = MockStream;

    fn name(&self) -> String {
        "Mock engine".to_string()
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![DeviceInfo {
            index: 0,
            name: "Mock Device".to_string(),
            max_input_channels: 2,
            max_output_channels: 2,
            default_sample_rate: 48000,
        }])
    }

    fn open_stream(&self, params: &EngineStreamParams, callback: EngineCallback) -> Result<Self::Stream> {
        if self.fail_open {
            return Err(Error::StreamOpen("mock refused".to_string()));
        }
        *self.callback.lock().unwrap() = Some(callback);
        *self.params.lock().unwrap() = Some(params.clone());
        Ok(MockStream {
            events: self.events.clone(),
            info: EngineStreamInfo {
                input_latency: self.input_latency,
                output_latency: 0.0,
                sample_rate: params.sample_rate,
            },
            time: self.stream_time,
            fail_start: self.fail_start,
        })
    }
}

/// Route library logging to the test harness; `RUST_LOG=debug` shows drain events
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Bytes `start, start+1, ...` wrapping at 256
pub fn ramp(start: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| start.wrapping_add(i as u8)).collect()
}
