//! Fill a fixed-size buffer from a queue of variable-size chunks

use crate::config::FrameLayout;
use crate::queue::ChunkQueue;
use log::debug;

/// Result of one [`fill_buffer`] call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillOutcome {
    /// Bytes copied from queued chunks; the rest of the buffer is silence
    pub bytes_written: usize,
    /// Stream time of the first byte written, 0 when no layout was given or nothing was read
    pub timestamp: f64,
    /// The queue ran dry after `quit` and the tail was zero-filled
    pub finished: bool,
}

/// Copy bytes from `queue` into `dst` until it is full or the queue is exhausted.
///
/// Blocks in [`ChunkQueue::wait_next`] while no data is queued. When the queue
/// has been quit and holds nothing more, the remainder of `dst` is zeroed and
/// the outcome is marked finished.
///
/// With a `layout`, the returned timestamp is the first chunk's timestamp
/// advanced by the bytes already consumed from it, so it points at `dst[0]`
/// even when the read resumes mid-chunk.
pub fn fill_buffer(queue: &ChunkQueue, dst: &mut [u8], layout: Option<&FrameLayout>) -> FillOutcome {
    let mut written = 0;
    let mut timestamp = 0.0;
    let mut finished = false;

    while written < dst.len() {
        if queue.current_remaining() == 0 {
            queue.wait_next();
            if !queue.has_current() {
                debug!(
                    "Finishing - {} bytes not available to fill the last buffer",
                    dst.len() - written
                );
                dst[written..].fill(0);
                finished = true;
                break;
            }
        }

        if written == 0 {
            if let (Some(layout), Some(chunk_ts)) = (layout, queue.current_timestamp()) {
                timestamp = chunk_ts + layout.seconds_for_bytes(queue.current_offset());
            }
        }

        let copied = queue.copy_current(&mut dst[written..]);
        queue.inc_offset(copied);
        written += copied;
    }

    FillOutcome {
        bytes_written: written,
        timestamp,
        finished,
    }
}
