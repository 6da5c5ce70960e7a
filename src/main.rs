mod commands;
mod session;

use clap::{Args, Parser, Subcommand};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;
use streamio::prelude::*;

use crate::session::{Overrides, SessionConfig};

#[derive(Parser, Debug)]
#[command(name = "streamio", version, about = "Record, play and loop back raw audio")]
struct Cli {
    /// Session file (defaults to config.json in the user config directory)
    #[arg(long, env = "STREAMIO_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List audio devices
    Devices,
    /// Record raw interleaved audio to a file
    Record {
        /// Output file
        path: PathBuf,
        /// Seconds to capture
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
        #[command(flatten)]
        stream: StreamArgs,
    },
    /// Play a raw interleaved audio file
    Play {
        /// Input file
        path: PathBuf,
        #[command(flatten)]
        stream: StreamArgs,
    },
    /// Send captured input straight to the output
    Loopback {
        /// Seconds to run
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
        #[command(flatten)]
        stream: StreamArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct StreamArgs {
    /// Device index from `streamio devices`
    #[arg(long)]
    device: Option<usize>,
    /// Channel count
    #[arg(long)]
    channels: Option<u16>,
    /// Sample rate in Hz
    #[arg(long)]
    rate: Option<u32>,
    /// Sample format code: 1 (float32), 8, 16, 24 or 32
    #[arg(long)]
    format: Option<u32>,
    /// Maximum chunks held in each queue (0 = unbounded)
    #[arg(long)]
    max_queue: Option<usize>,
    /// Frames per engine callback
    #[arg(long)]
    frames_per_buffer: Option<u32>,
}

impl From<&StreamArgs> for Overrides {
    fn from(args: &StreamArgs) -> Self {
        Overrides {
            device: args.device,
            channels: args.channels,
            rate: args.rate,
            format: args.format,
            max_queue: args.max_queue,
            frames_per_buffer: args.frames_per_buffer,
        }
    }
}

fn session(cli: &Cli, args: &StreamArgs) -> Result<SessionConfig> {
    let mut session = SessionConfig::load(cli.config.as_deref())?;
    session.apply(&Overrides::from(args))?;
    Ok(session)
}

fn run(cli: Cli) -> Result<()> {
    let engine = CpalEngine::new()?;
    match &cli.command {
        Command::Devices => commands::devices(&engine),
        Command::Record { path, seconds, stream } => {
            let session = session(&cli, stream)?;
            commands::record(&engine, session.input, path, *seconds)
        }
        Command::Play { path, stream } => {
            let session = session(&cli, stream)?;
            commands::play(&engine, session.output, path)
        }
        Command::Loopback { seconds, stream } => {
            let session = session(&cli, stream)?;
            commands::loopback(&engine, session.input, session.output, *seconds)
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
