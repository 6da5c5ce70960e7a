//! One direction of a stream: its config and its chunk queue

use crate::{
    chunk::Chunk,
    config::{FrameLayout, StreamConfig},
    fill::{fill_buffer, FillOutcome},
    queue::ChunkQueue,
};
use std::sync::Arc;

/// A directional sub-channel.
///
/// Input channels are fed by [`capture`](Self::capture) on the engine thread
/// and drained by [`pull`](Self::pull) on the application side. Output
/// channels are fed by [`push`](Self::push) and drained by
/// [`render`](Self::render). Clones share the same queue.
#[derive(Debug, Clone)]
pub struct DirectionChannel {
    config: StreamConfig,
    queue: Arc<ChunkQueue>,
}

impl DirectionChannel {
    /// Create a channel with an empty queue sized from the config
    pub fn new(config: StreamConfig) -> Self {
        let queue = Arc::new(ChunkQueue::new(config.max_queued_chunks));
        Self { config, queue }
    }

    /// Direction parameters
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Byte geometry
    pub fn layout(&self) -> FrameLayout {
        self.config.layout()
    }

    /// Underlying queue
    pub fn queue(&self) -> &Arc<ChunkQueue> {
        &self.queue
    }

    /// Bytes in a period of `frame_count` frames
    pub fn period_bytes(&self, frame_count: usize) -> usize {
        self.layout().bytes_for_frames(frame_count)
    }

    /// Copy one period of captured device bytes into a new chunk and queue it.
    ///
    /// Returns `false` if the queue has been quit and the data was dropped.
    pub fn capture(&self, src: &[u8], frame_count: usize, timestamp: f64) -> bool {
        let len = self.period_bytes(frame_count).min(src.len());
        self.queue.push(Chunk::new(src[..len].to_vec(), timestamp))
    }

    /// Fill one period of device output from the queue
    pub fn render(&self, dst: &mut [u8], frame_count: usize) -> FillOutcome {
        let len = self.period_bytes(frame_count).min(dst.len());
        let (period, rest) = dst.split_at_mut(len);
        rest.fill(0);
        fill_buffer(&self.queue, period, None)
    }

    /// Read up to `num_bytes` from the queue into a new chunk.
    ///
    /// The chunk is shorter than requested when the queue ran dry after
    /// `quit`, and empty at end of stream. Its timestamp points at its first byte.
    pub fn pull(&self, num_bytes: usize) -> Chunk {
        let layout = self.layout();
        let mut buffer = vec![0u8; num_bytes];
        let outcome = fill_buffer(&self.queue, &mut buffer, Some(&layout));
        if outcome.bytes_written != num_bytes {
            buffer.truncate(outcome.bytes_written);
            buffer.shrink_to_fit();
        }
        Chunk::new(buffer, outcome.timestamp)
    }

    /// Queue a chunk for playback, blocking while the queue is full
    pub fn push(&self, chunk: Chunk) -> bool {
        self.queue.push(chunk)
    }

    /// Release any thread blocked on this channel's queue
    pub fn quit(&self) {
        self.queue.quit();
    }
}
