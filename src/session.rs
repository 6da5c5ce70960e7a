//! Session file loading and command-line overrides

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use streamio::{Result, SampleFormat, StreamConfig};

/// Input and output parameters for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub input: StreamConfig,
    pub output: StreamConfig,
}

/// Values given on the command line, applied on top of the session file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub device: Option<usize>,
    pub channels: Option<u16>,
    pub rate: Option<u32>,
    pub format: Option<u32>,
    pub max_queue: Option<usize>,
    pub frames_per_buffer: Option<u32>,
}

impl SessionConfig {
    /// Load from `path`, or from the user config directory when `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No session file, using defaults");
                    return Ok(Self::default());
                }
            },
        };
        info!("Loading session from {}", path.display());
        let text = fs::read_to_string(&path)?;
        let session: SessionConfig = serde_json::from_str(&text)?;
        session.input.validate()?;
        session.output.validate()?;
        Ok(session)
    }

    /// Apply command-line values to both directions
    pub fn apply(&mut self, overrides: &Overrides) -> Result<()> {
        let format = overrides.format.map(SampleFormat::from_code).transpose()?;
        for config in [&mut self.input, &mut self.output] {
            if let Some(device) = overrides.device {
                config.device_id = Some(device);
            }
            if let Some(channels) = overrides.channels {
                config.channel_count = channels;
            }
            if let Some(rate) = overrides.rate {
                config.sample_rate = rate;
            }
            if let Some(format) = format {
                config.sample_format = format;
            }
            if let Some(max_queue) = overrides.max_queue {
                config.max_queued_chunks = max_queue;
            }
            if let Some(frames) = overrides.frames_per_buffer {
                config.frames_per_buffer = Some(frames);
            }
            config.validate()?;
        }
        Ok(())
    }
}

/// `<config dir>/config.json` for this application
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "streamio", "streamio").map(|dirs| dirs.config_dir().join("config.json"))
}
