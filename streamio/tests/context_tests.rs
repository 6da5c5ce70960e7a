mod common;

use common::{init_logging, ramp, MockEngine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use streamio::prelude::*;
use streamio::{CallbackResult, CallbackTimeInfo, DirectionChannel, StatusFlags};

fn stereo_f32() -> StreamConfig {
    StreamConfig::new(2, SampleFormat::Float32, 48000)
}

fn at(current_time: f64) -> CallbackTimeInfo {
    CallbackTimeInfo {
        current_time,
        ..CallbackTimeInfo::default()
    }
}

#[test]
fn test_open_requires_a_direction() {
    let engine = MockEngine::new();
    let result = StreamContext::open(&engine, None, None);
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[test]
fn test_open_rejects_mismatched_rates() {
    let engine = MockEngine::new();
    let input = StreamConfig::new(2, SampleFormat::Int16, 44100);
    let output = StreamConfig::new(2, SampleFormat::Int16, 48000);
    let result = StreamContext::open(&engine, Some(input), Some(output));
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[test]
fn test_open_propagates_engine_failure() {
    let engine = MockEngine {
        fail_open: true,
        ..MockEngine::new()
    };
    let result = StreamContext::open(&engine, None, Some(stereo_f32()));
    assert!(matches!(result, Err(Error::StreamOpen(_))));
}

#[test]
fn test_open_passes_shared_params() {
    let engine = MockEngine::new();
    let input = stereo_f32().frames_per_buffer(256);
    let context = StreamContext::open(&engine, Some(input), Some(stereo_f32())).unwrap();
    assert_eq!(context.sample_rate(), 48000);
    assert!(context.has_input() && context.has_output());

    let params = engine.params.lock().unwrap().clone().unwrap();
    assert_eq!(params.sample_rate, 48000);
    assert_eq!(params.frames_per_buffer, Some(256));
}

#[test]
fn test_input_period_becomes_timestamped_chunk() {
    let engine = MockEngine::new();
    let context = StreamContext::open(&engine, Some(stereo_f32()), None).unwrap();

    let period = ramp(0, 8 * 16);
    let time = CallbackTimeInfo {
        input_adc_time: 3.25,
        ..at(4.0)
    };
    let result = engine.run_period(Some(&period), None, 16, time, StatusFlags::empty());
    assert_eq!(result, CallbackResult::Continue);

    let chunk = context.pull_input_chunk(period.len()).unwrap();
    assert_eq!(chunk.bytes(), &period[..]);
    assert_eq!(chunk.timestamp(), 3.25);
}

#[test]
fn test_input_timestamp_falls_back_to_latency_estimate() {
    let engine = MockEngine::with_input_latency(0.01);
    let context = StreamContext::open(&engine, Some(stereo_f32()), None).unwrap();
    assert_eq!(context.input_latency(), 0.01);

    let period = vec![0u8; 64];
    engine.run_period(Some(&period), None, 8, at(2.0), StatusFlags::empty());

    let chunk = context.pull_input_chunk(64).unwrap();
    assert!((chunk.timestamp() - 1.99).abs() < 1e-12);
}

#[test]
fn test_short_pull_is_trimmed() {
    let channel = DirectionChannel::new(stereo_f32());
    let data = ramp(5, 400);
    assert!(channel.capture(&data, 50, 1.0));
    channel.quit();

    let chunk = channel.pull(1000);
    assert_eq!(chunk.len(), 400);
    assert_eq!(chunk.bytes(), &data[..]);

    let end = channel.pull(1000);
    assert!(end.is_empty());
}

#[test]
fn test_output_period_drains_pushed_chunks() {
    init_logging();
    let engine = MockEngine::new();
    let context = StreamContext::open(&engine, None, Some(stereo_f32())).unwrap();

    let data = ramp(1, 100);
    assert!(context.push_output_chunk(Chunk::new(data.clone(), 0.0)).unwrap());
    context.quit();

    let mut device = vec![0xEEu8; 8 * 16];
    let result = engine.run_period(None, Some(&mut device), 16, at(0.0), StatusFlags::empty());
    assert_eq!(result, CallbackResult::Complete);
    assert_eq!(&device[..100], &data[..]);
    assert!(device[100..].iter().all(|&b| b == 0));

    // Once quit and drained, periods stay silent
    let mut device = vec![0xEEu8; 8 * 16];
    let result = engine.run_period(None, Some(&mut device), 16, at(0.0), StatusFlags::empty());
    assert_eq!(result, CallbackResult::Complete);
    assert!(device.iter().all(|&b| b == 0));
}

#[test]
fn test_duplex_completes_only_when_both_directions_do() {
    let engine = MockEngine::new();
    let context = StreamContext::open(&engine, Some(stereo_f32()), Some(stereo_f32())).unwrap();
    context.quit();

    let input = vec![0u8; 64];
    let mut output = vec![0u8; 64];
    let result = engine.run_period(Some(&input), Some(&mut output), 8, at(0.0), StatusFlags::empty());
    // Output finished, but input never self-terminates
    assert_eq!(result, CallbackResult::Continue);
}

#[test]
fn test_status_propagates_when_close_on_error() {
    let engine = MockEngine::new();
    let context = StreamContext::open(&engine, None, Some(stereo_f32().close_on_error(true))).unwrap();
    context.quit();

    let mut output = vec![0u8; 64];
    let flags = StatusFlags::OUTPUT_UNDERFLOW | StatusFlags::PRIMING_OUTPUT;
    engine.run_period(None, Some(&mut output), 8, at(0.0), flags);

    assert_eq!(
        context.fetch_and_clear_error(Direction::Output).as_deref(),
        Some("status - output underflow priming output ")
    );
    assert_eq!(context.fetch_and_clear_error(Direction::Output), None);
}

#[test]
fn test_status_is_logged_and_cleared_without_close_on_error() {
    init_logging();
    let engine = MockEngine::new();
    let context = StreamContext::open(&engine, Some(stereo_f32().close_on_error(false)), None).unwrap();

    let input = vec![0u8; 64];
    engine.run_period(Some(&input), None, 8, at(0.0), StatusFlags::INPUT_OVERFLOW);

    assert_eq!(context.fetch_and_clear_error(Direction::Input), None);
    assert_eq!(context.fetch_and_clear_error(Direction::Input), None);
}

#[test]
fn test_latest_status_wins() {
    let engine = MockEngine::new();
    let context = StreamContext::open(&engine, Some(stereo_f32()), None).unwrap();

    let input = vec![0u8; 64];
    engine.run_period(Some(&input), None, 8, at(0.0), StatusFlags::INPUT_OVERFLOW);
    engine.run_period(Some(&input), None, 8, at(0.0), StatusFlags::empty());
    engine.run_period(Some(&input), None, 8, at(0.0), StatusFlags::INPUT_UNDERFLOW);

    assert_eq!(
        context.fetch_and_clear_error(Direction::Input).as_deref(),
        Some("status - input underflow ")
    );
}

#[test]
fn test_wrong_direction_is_an_error() {
    let engine = MockEngine::new();
    let context = StreamContext::open(&engine, None, Some(stereo_f32())).unwrap();
    assert!(matches!(
        context.pull_input_chunk(16),
        Err(Error::DirectionNotConfigured(Direction::Input))
    ));

    let engine = MockEngine::new();
    let context = StreamContext::open(&engine, Some(stereo_f32()), None).unwrap();
    assert!(matches!(
        context.push_output_chunk(Chunk::empty(0.0)),
        Err(Error::DirectionNotConfigured(Direction::Output))
    ));
}

#[test]
fn test_lifecycle_is_terminal_after_stop() {
    let engine = MockEngine::new();
    let mut context = StreamContext::open(&engine, None, Some(stereo_f32())).unwrap();

    context.start().unwrap();
    assert!(context.is_running());
    context.stop(StopMode::Abort).unwrap();
    assert!(context.is_closed());
    assert_eq!(engine.events(), vec!["start", "abort", "close"]);

    assert!(matches!(context.start(), Err(Error::StreamClosed)));
    assert!(matches!(context.stop(StopMode::Abort), Err(Error::StreamClosed)));
}

#[test]
fn test_start_failure_is_reported() {
    let engine = MockEngine {
        fail_start: true,
        ..MockEngine::new()
    };
    let mut context = StreamContext::open(&engine, None, Some(stereo_f32())).unwrap();
    assert!(matches!(context.start(), Err(Error::StreamStart(_))));
    assert!(!context.is_running());
}

#[test]
fn test_drain_plays_out_queued_output() {
    init_logging();
    let engine = MockEngine::new();
    let mut context = StreamContext::open(&engine, None, Some(stereo_f32())).unwrap();
    context.start().unwrap();

    let data = ramp(0, 200);
    context.push_output_chunk(Chunk::new(data.clone(), 0.0)).unwrap();

    let (tx, rx) = mpsc::channel();
    let engine_thread = {
        let engine = engine.clone();
        thread::spawn(move || {
            let mut played = Vec::new();
            loop {
                let mut period = vec![0u8; 64];
                let result = engine.run_period(None, Some(&mut period), 8, at(0.0), StatusFlags::empty());
                played.extend_from_slice(&period);
                if result == CallbackResult::Complete {
                    break;
                }
            }
            tx.send(played).unwrap();
        })
    };

    context.stop(StopMode::Drain).unwrap();
    let played = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    engine_thread.join().unwrap();

    assert_eq!(&played[..200], &data[..]);
    assert!(played[200..].iter().all(|&b| b == 0));
    assert_eq!(engine.events(), vec!["start", "stop", "close"]);
}

#[test]
fn test_quit_unblocks_waiting_application() {
    let engine = MockEngine::new();
    let context = Arc::new(StreamContext::open(&engine, Some(stereo_f32()), None).unwrap());

    let reader = {
        let context = context.clone();
        thread::spawn(move || context.pull_input_chunk(128).unwrap())
    };

    thread::sleep(Duration::from_millis(50));
    context.quit();
    let chunk = reader.join().unwrap();
    assert!(chunk.is_empty());
}

#[test]
fn test_drop_aborts_and_closes() {
    let engine = MockEngine::new();
    {
        let mut context = StreamContext::open(&engine, Some(stereo_f32()), None).unwrap();
        context.start().unwrap();
    }
    assert_eq!(engine.events(), vec!["start", "abort", "close"]);
}

#[test]
fn test_status_for_missing_direction_is_left_for_the_other() {
    let engine = MockEngine::new();
    let context = StreamContext::open(&engine, None, Some(stereo_f32().close_on_error(true))).unwrap();
    context.quit();

    let mut output = vec![0u8; 64];
    engine.run_period(None, Some(&mut output), 8, at(0.0), StatusFlags::OUTPUT_UNDERFLOW);

    assert_eq!(context.fetch_and_clear_error(Direction::Input), None);
    assert_eq!(
        context.fetch_and_clear_error(Direction::Output).as_deref(),
        Some("status - output underflow ")
    );
}

#[test]
fn test_abort_releases_engine_blocked_on_full_input() {
    let engine = MockEngine::new();
    let input = stereo_f32().max_queued_chunks(1);
    let mut context = StreamContext::open(&engine, Some(input), None).unwrap();
    context.start().unwrap();

    let (tx, rx) = mpsc::channel();
    let engine_thread = {
        let engine = engine.clone();
        thread::spawn(move || {
            let period = vec![0u8; 64];
            engine.run_period(Some(&period), None, 8, at(0.0), StatusFlags::empty());
            // Queue is full; this period waits until the stream is torn down
            engine.run_period(Some(&period), None, 8, at(0.0), StatusFlags::empty());
            tx.send(()).unwrap();
        })
    };

    thread::sleep(Duration::from_millis(50));
    context.stop(StopMode::Abort).unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    engine_thread.join().unwrap();
    assert_eq!(engine.events(), vec!["start", "abort", "close"]);
}

#[test]
fn test_push_after_abort_returns_instead_of_blocking() {
    let engine = MockEngine::new();
    let output = stereo_f32().max_queued_chunks(1);
    let mut context = StreamContext::open(&engine, None, Some(output)).unwrap();
    assert!(context.push_output_chunk(Chunk::new(ramp(0, 64), 0.0)).unwrap());
    context.stop(StopMode::Abort).unwrap();

    let context = Arc::new(context);
    let (tx, rx) = mpsc::channel();
    {
        let context = context.clone();
        thread::spawn(move || {
            tx.send(context.push_output_chunk(Chunk::new(ramp(0, 64), 0.0)).unwrap())
                .unwrap();
        });
    }
    assert!(!rx.recv_timeout(Duration::from_secs(5)).unwrap());
}

#[test]
fn test_pull_after_abort_returns_end_of_stream() {
    let engine = MockEngine::new();
    let mut context = StreamContext::open(&engine, Some(stereo_f32()), None).unwrap();
    context.start().unwrap();
    context.stop(StopMode::Abort).unwrap();

    let context = Arc::new(context);
    let (tx, rx) = mpsc::channel();
    {
        let context = context.clone();
        thread::spawn(move || {
            tx.send(context.pull_input_chunk(128).unwrap()).unwrap();
        });
    }
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap().is_empty());
}

#[test]
fn test_duplex_drain_releases_input_and_plays_out_output() {
    init_logging();
    let engine = MockEngine::new();
    let input = stereo_f32().max_queued_chunks(1);
    let mut context = StreamContext::open(&engine, Some(input), Some(stereo_f32())).unwrap();
    context.start().unwrap();

    let data = ramp(0, 100);
    context.push_output_chunk(Chunk::new(data.clone(), 0.0)).unwrap();

    let stopped = Arc::new(AtomicBool::new(false));
    let engine_thread = {
        let engine = engine.clone();
        let stopped = stopped.clone();
        thread::spawn(move || {
            let captured = vec![0u8; 64];
            let mut played = Vec::new();
            while !stopped.load(Ordering::SeqCst) {
                let mut period = vec![0xEEu8; 64];
                let result = engine.run_period(Some(&captured), Some(&mut period), 8, at(0.0), StatusFlags::empty());
                assert_eq!(result, CallbackResult::Continue);
                played.extend_from_slice(&period);
            }
            played
        })
    };

    context.stop(StopMode::Drain).unwrap();
    stopped.store(true, Ordering::SeqCst);
    let played = engine_thread.join().unwrap();

    assert_eq!(&played[..100], &data[..]);
    assert!(played[100..].iter().all(|&b| b == 0));
    assert_eq!(engine.events(), vec!["start", "stop", "close"]);
}

#[test]
fn test_stream_time_comes_from_engine() {
    let engine = MockEngine {
        stream_time: 12.5,
        ..MockEngine::new()
    };
    let context = StreamContext::open(&engine, Some(stereo_f32()), None).unwrap();
    assert_eq!(context.stream_time(), 12.5);
}
