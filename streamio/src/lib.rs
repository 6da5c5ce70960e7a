//! # streamio
//!
//! Stream audio between a realtime engine callback and ordinary application
//! threads.
//!
//! Captured periods are queued as timestamped [`Chunk`]s for the application
//! to pull in any size; chunks the application pushes are sliced into the
//! fixed-size periods the engine asks for. Queues are bounded, and once a
//! stream is quit the output plays out what is queued and then renders
//! silence.
//!
//! ## Quick Start
//!
//! ```no_run
//! use streamio::prelude::*;
//!
//! # fn main() -> streamio::Result<()> {
//! let engine = CpalEngine::new()?;
//! let input = StreamConfig::new(2, SampleFormat::Int16, 48000);
//! let output = StreamConfig::new(2, SampleFormat::Int16, 48000);
//!
//! let mut context = StreamContext::open(&engine, Some(input), Some(output))?;
//! context.start()?;
//!
//! // Loop captured audio straight back out
//! for _ in 0..100 {
//!     let chunk = context.pull_input_chunk(4096)?;
//!     if chunk.is_empty() {
//!         break;
//!     }
//!     context.push_output_chunk(chunk)?;
//! }
//!
//! context.stop(StopMode::Drain)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod channel;
pub mod chunk;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod fill;
pub mod queue;
pub mod status;

pub mod backends;

pub use channel::DirectionChannel;
pub use chunk::Chunk;
pub use config::{Direction, FrameLayout, SampleFormat, StreamConfig};
pub use context::{StopMode, StreamContext};
pub use engine::{
    AudioEngine, CallbackData, CallbackResult, CallbackTimeInfo, DeviceInfo, EngineCallback,
    EngineStream, EngineStreamInfo, EngineStreamParams,
};
pub use error::{Error, Result};
pub use fill::{fill_buffer, FillOutcome};
pub use queue::ChunkQueue;
pub use status::{StatusFlags, StatusMailbox};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        chunk::Chunk,
        config::{Direction, SampleFormat, StreamConfig},
        context::{StopMode, StreamContext},
        engine::AudioEngine,
        error::{Error, Result},
    };

    #[cfg(feature = "cpal-backend")]
    pub use crate::backends::CpalEngine;
}
