//! Timestamped audio chunks

/// An immutable block of interleaved audio bytes.
///
/// The timestamp is stream-relative and refers to the first byte of the
/// buffer. Consumers track their read position outside the chunk; the bytes
/// themselves never change once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    buffer: Vec<u8>,
    timestamp: f64,
}

impl Chunk {
    /// Create a chunk, taking ownership of the buffer
    pub fn new(buffer: Vec<u8>, timestamp: f64) -> Self {
        Self { buffer, timestamp }
    }

    /// A chunk with no data, used to signal end of stream
    pub fn empty(timestamp: f64) -> Self {
        Self::new(Vec::new(), timestamp)
    }

    /// Audio bytes
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the chunk carries no data
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Stream time of the first byte, in seconds
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Give the buffer back to the caller
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}
