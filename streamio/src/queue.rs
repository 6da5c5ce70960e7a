//! Bounded blocking chunk queue
//!
//! A [`ChunkQueue`] hands [`Chunk`]s from exactly one producer thread to
//! exactly one consumer thread. The consumer reads the front chunk in place
//! through a byte cursor and only releases it once every byte has been read,
//! so a fixed-size audio period can be assembled from chunks of any size.
//!
//! Both blocking points (`push` at capacity, `wait_next` when empty) are
//! released permanently by [`ChunkQueue::quit`].

use crate::chunk::Chunk;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct QueueState {
    queued: VecDeque<Chunk>,
    current: Option<Chunk>,
    offset: usize,
    quitting: bool,
}

impl QueueState {
    fn current_exhausted(&self) -> bool {
        match self.current {
            Some(ref chunk) => self.offset >= chunk.len(),
            None => true,
        }
    }
}

/// FIFO of chunks with backpressure, a partial-read cursor and cooperative shutdown
#[derive(Debug)]
pub struct ChunkQueue {
    max_queued: usize,
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl ChunkQueue {
    /// Create an empty queue holding at most `max_queued` chunks (0 = unbounded)
    pub fn new(max_queued: usize) -> Self {
        Self {
            max_queued,
            state: Mutex::new(QueueState::default()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // A panicking peer must not wedge the audio thread
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capacity bound, 0 when unbounded
    pub fn capacity(&self) -> usize {
        self.max_queued
    }

    /// Number of chunks waiting behind the current one
    pub fn len(&self) -> usize {
        self.lock().queued.len()
    }

    /// Whether no chunk is waiting behind the current one
    pub fn is_empty(&self) -> bool {
        self.lock().queued.is_empty()
    }

    /// Append a chunk, blocking while the queue is full.
    ///
    /// Returns `false` without enqueuing once the queue has been quit; the
    /// chunk is dropped in that case.
    pub fn push(&self, chunk: Chunk) -> bool {
        let mut state = self.lock();
        while self.max_queued > 0 && state.queued.len() >= self.max_queued && !state.quitting {
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.quitting {
            return false;
        }
        state.queued.push_back(chunk);
        drop(state);
        self.not_empty.notify_one();
        true
    }

    /// Make the next unread chunk current.
    ///
    /// Does nothing while the current chunk still has unread bytes. Otherwise
    /// the consumed chunk is released and the next one is popped, blocking
    /// while the queue is empty. Once quit with nothing left to pop, returns
    /// with no current chunk.
    pub fn wait_next(&self) {
        let mut state = self.lock();
        if !state.current_exhausted() {
            return;
        }
        state.current = None;
        state.offset = 0;
        loop {
            if let Some(chunk) = state.queued.pop_front() {
                state.current = Some(chunk);
                drop(state);
                self.not_full.notify_one();
                return;
            }
            if state.quitting {
                return;
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Whether a current chunk is present
    pub fn has_current(&self) -> bool {
        self.lock().current.is_some()
    }

    /// Total length of the current chunk, 0 when absent
    pub fn current_len(&self) -> usize {
        self.lock().current.as_ref().map_or(0, Chunk::len)
    }

    /// Bytes already read from the current chunk
    pub fn current_offset(&self) -> usize {
        self.lock().offset
    }

    /// Unread bytes left in the current chunk
    pub fn current_remaining(&self) -> usize {
        let state = self.lock();
        state
            .current
            .as_ref()
            .map_or(0, |chunk| chunk.len() - state.offset)
    }

    /// Timestamp of the current chunk's first byte
    pub fn current_timestamp(&self) -> Option<f64> {
        self.lock().current.as_ref().map(Chunk::timestamp)
    }

    /// Copy unread bytes of the current chunk into `dst` without advancing.
    ///
    /// Returns the number of bytes copied.
    pub fn copy_current(&self, dst: &mut [u8]) -> usize {
        let state = self.lock();
        match state.current {
            Some(ref chunk) => {
                let unread = &chunk.bytes()[state.offset..];
                let count = unread.len().min(dst.len());
                dst[..count].copy_from_slice(&unread[..count]);
                count
            }
            None => 0,
        }
    }

    /// Mark `count` bytes of the current chunk as read
    pub fn inc_offset(&self, count: usize) {
        let mut state = self.lock();
        let len = state.current.as_ref().map_or(0, Chunk::len);
        debug_assert!(state.offset + count <= len, "offset advanced past chunk end");
        state.offset = (state.offset + count).min(len);
    }

    /// Release every blocked caller, now and forever
    pub fn quit(&self) {
        let mut state = self.lock();
        state.quitting = true;
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Whether [`quit`](Self::quit) has been called
    pub fn is_quitting(&self) -> bool {
        self.lock().quitting
    }
}

impl Default for ChunkQueue {
    fn default() -> Self {
        Self::new(0)
    }
}
