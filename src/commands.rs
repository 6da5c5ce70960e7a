//! Command implementations

use log::{error, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use streamio::prelude::*;

/// Frames moved per application read or write
const FRAMES_PER_CHUNK: usize = 1024;

/// Print every device the engine knows about
pub fn devices(engine: &CpalEngine) -> Result<()> {
    println!("{}", engine.name());
    for device in engine.devices()? {
        println!(
            "  [{}] {} (in {}, out {}, {} Hz)",
            device.index,
            device.name,
            device.max_input_channels,
            device.max_output_channels,
            device.default_sample_rate
        );
    }
    Ok(())
}

/// Capture `seconds` of input into a raw file
pub fn record(engine: &CpalEngine, config: StreamConfig, path: &Path, seconds: f64) -> Result<()> {
    let layout = config.layout();
    let chunk_bytes = layout.bytes_for_frames(FRAMES_PER_CHUNK);
    let total_bytes = layout.bytes_for_frames((seconds * config.sample_rate as f64) as usize);

    let mut writer = BufWriter::new(File::create(path)?);
    let mut context = StreamContext::open(engine, Some(config), None)?;
    context.start()?;

    let mut written = 0;
    while written < total_bytes {
        if let Some(status) = context.fetch_and_clear_error(Direction::Input) {
            error!("Stopping capture: {}", status);
            break;
        }
        let chunk = context.pull_input_chunk(chunk_bytes.min(total_bytes - written))?;
        if chunk.is_empty() {
            break;
        }
        writer.write_all(chunk.bytes())?;
        written += chunk.len();
    }

    let elapsed = context.stream_time();
    context.stop(StopMode::Abort)?;
    writer.flush()?;
    info!("Recorded {} bytes to {} ({:.2}s stream time)", written, path.display(), elapsed);
    Ok(())
}

/// Play a raw file, then let the queued tail play out
pub fn play(engine: &CpalEngine, config: StreamConfig, path: &Path) -> Result<()> {
    let chunk_bytes = config.layout().bytes_for_frames(FRAMES_PER_CHUNK);
    let mut reader = BufReader::new(File::open(path)?);
    let mut context = StreamContext::open(engine, None, Some(config))?;
    context.start()?;

    let mut sent = 0;
    loop {
        if let Some(status) = context.fetch_and_clear_error(Direction::Output) {
            error!("Stopping playback: {}", status);
            context.stop(StopMode::Abort)?;
            return Ok(());
        }
        let mut buffer = vec![0u8; chunk_bytes];
        let read = read_full(&mut reader, &mut buffer)?;
        if read == 0 {
            break;
        }
        buffer.truncate(read);
        if !context.push_output_chunk(Chunk::new(buffer, 0.0))? {
            break;
        }
        sent += read;
    }

    context.stop(StopMode::Drain)?;
    info!("Played {} bytes from {}", sent, path.display());
    Ok(())
}

/// Route input straight to output for `seconds`
pub fn loopback(engine: &CpalEngine, input: StreamConfig, output: StreamConfig, seconds: f64) -> Result<()> {
    let chunk_bytes = input.layout().bytes_for_frames(FRAMES_PER_CHUNK);
    let mut context = StreamContext::open(engine, Some(input), Some(output))?;
    context.start()?;

    let deadline = Instant::now() + Duration::from_secs_f64(seconds);
    while Instant::now() < deadline {
        for direction in [Direction::Input, Direction::Output] {
            if let Some(status) = context.fetch_and_clear_error(direction) {
                error!("{} status: {}", direction, status);
            }
        }
        let chunk = context.pull_input_chunk(chunk_bytes)?;
        if chunk.is_empty() || !context.push_output_chunk(chunk)? {
            break;
        }
    }

    context.stop(StopMode::Drain)
}

/// Read until `buf` is full or the reader is exhausted
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
