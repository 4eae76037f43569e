//! Consumer side of a collection stream

use std::collections::VecDeque;

use crate::codec::Chunk;

/// Receives the chunks of a stream
///
/// The return value of `push` is the acknowledgement: `true` lets the
/// stream keep draining, `false` pauses it until the next pull.
pub trait ChunkSink: Send {
    /// Accept one chunk
    fn push(&mut self, chunk: Chunk) -> bool;

    /// End of stream; called exactly once, after the last chunk
    fn end(&mut self);
}

/// Queueing sink with a high-water mark
///
/// Accepts every chunk but acknowledges `false` once `high_water_mark`
/// chunks are waiting to be taken.
#[derive(Debug)]
pub struct ChunkBuffer {
    queue: VecDeque<Chunk>,
    high_water_mark: usize,
    ended: bool,
}

impl ChunkBuffer {
    /// Create a buffer; a zero mark is treated as 1
    pub fn new(high_water_mark: usize) -> Self {
        let high_water_mark = high_water_mark.max(1);
        Self {
            queue: VecDeque::with_capacity(high_water_mark),
            high_water_mark,
            ended: false,
        }
    }

    /// Take the oldest chunk
    pub fn pop(&mut self) -> Option<Chunk> {
        self.queue.pop_front()
    }

    /// Take every queued chunk
    pub fn drain(&mut self) -> Vec<Chunk> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether the end of stream was signalled
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }
}

impl ChunkSink for ChunkBuffer {
    fn push(&mut self, chunk: Chunk) -> bool {
        self.queue.push_back(chunk);
        self.queue.len() < self.high_water_mark
    }

    fn end(&mut self) {
        self.ended = true;
    }
}
