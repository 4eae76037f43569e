//! `futures::Stream` view of a collection stream
//!
//! The adapter pulls through a one-slot [`ChunkBuffer`], so every chunk
//! pauses the engine until the consumer polls for the next one. A consumer
//! that stops polling leaves the cursor suspended.

use futures::Stream;

use super::{ChunkBuffer, CollectionStream, PullOutcome};
use crate::codec::Chunk;
use crate::error::Result;
use crate::store::DocumentStore;

impl<S: DocumentStore> CollectionStream<S> {
    /// Consume the stream as a `futures::Stream` of chunks
    ///
    /// The stream ends after the last chunk, or after cancellation. A fatal
    /// error is yielded once and ends it as well.
    pub fn into_chunk_stream(self) -> impl Stream<Item = Result<Chunk>> + Send {
        let size_hint = self.config().batch_size();
        futures::stream::try_unfold(
            (self, ChunkBuffer::new(1)),
            move |(stream, buffer)| next_chunk(stream, buffer, size_hint),
        )
    }
}

async fn next_chunk<S: DocumentStore>(
    mut stream: CollectionStream<S>,
    mut buffer: ChunkBuffer,
    size_hint: usize,
) -> Result<Option<(Chunk, (CollectionStream<S>, ChunkBuffer))>> {
    loop {
        if let Some(chunk) = buffer.pop() {
            return Ok(Some((chunk, (stream, buffer))));
        }
        if buffer.is_ended() {
            return Ok(None);
        }

        match stream.pull(size_hint, &mut buffer).await? {
            PullOutcome::Paused => {}
            PullOutcome::Finished | PullOutcome::Cancelled => {
                if buffer.is_empty() {
                    return Ok(None);
                }
            }
        }
    }
}
