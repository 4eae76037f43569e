//! Collection stream engine
//!
//! A [`CollectionStream`] turns an ordered list of collections into one
//! sequence of chunks. Each call to [`CollectionStream::pull`] advances a
//! state machine:
//!
//! ```text
//! Idle -> Connecting -> Scanning <-> Paused
//!                          |
//!                          v
//!                      Advancing -> Scanning (next collection)
//!                          |
//!                          v
//!                         Done
//! ```
//!
//! Records are read from the active cursor one at a time and emitted as a
//! chunk every `batch_size` records; the remainder of a collection is
//! flushed as a short chunk when its cursor runs dry. A sink that answers
//! `false` pauses the stream with the cursor left open, and the next pull
//! resumes from the next unread record.
//!
//! Failures release the cursor and connection before they are returned.
//! A connection failure before anything was emitted leaves the stream
//! `Idle`, so pulling again retries; any other failure is terminal.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::codec::{Chunk, RecordEncoder};
use crate::config::StreamConfig;
use crate::connection::MongoStore;
use crate::error::{ConnectionError, CursorError, Result, StreamError};
use crate::store::{CollectionHandle, DocumentStore, RecordCursor, StoreConnection};

mod adapter;
mod sink;
mod state;

pub use sink::{ChunkBuffer, ChunkSink};
pub use state::{Phase, StreamState};

#[cfg(test)]
mod tests;

/// Why a pull returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// The sink applied backpressure; pull again when ready for more
    Paused,

    /// The end of stream has been signalled
    Finished,

    /// The stream was cancelled and its resources released
    Cancelled,
}

/// Counters for one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Records handed to the sink
    pub records_emitted: u64,

    /// Chunks handed to the sink
    pub chunks_emitted: u64,

    /// Collections whose cursor was drained
    pub collections_completed: usize,
}

/// Backpressure-aware chunk stream over a sequence of collections
pub struct CollectionStream<S: DocumentStore> {
    /// Operation id, also attached to scans as a comment
    id: String,
    config: StreamConfig,
    store: S,
    encoder: RecordEncoder,
    state: StreamState<S>,
    phase: Phase,
    stats: StreamStats,
    cancel_token: Option<CancellationToken>,
}

/// Generate a unique stream id
///
/// Format: `collection-stream-<host>-<uuid>`
fn new_stream_id() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("collection-stream-{}-{}", host, Uuid::new_v4())
}

impl CollectionStream<MongoStore> {
    /// Create a stream over MongoDB
    ///
    /// Scans use the configured cursor batch size and carry the stream id as
    /// their comment.
    pub fn mongodb(config: StreamConfig) -> Self {
        let id = new_stream_id();
        let store = MongoStore::new(config.connection().clone())
            .with_cursor_batch_size(config.cursor_batch_size())
            .with_comment(id.clone());
        Self::with_id(id, config, store)
    }
}

impl<S: DocumentStore> CollectionStream<S> {
    /// Create a stream over any document store
    ///
    /// No I/O happens until the first pull.
    pub fn new(config: StreamConfig, store: S) -> Self {
        Self::with_id(new_stream_id(), config, store)
    }

    fn with_id(id: String, config: StreamConfig, store: S) -> Self {
        Self {
            id,
            encoder: RecordEncoder::new(config.encoding()),
            state: StreamState::new(config.batch_size()),
            store,
            config,
            phase: Phase::Idle,
            stats: StreamStats::default(),
            cancel_token: None,
        }
    }

    /// Set cancellation token for this stream
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &StreamState<S> {
        &self.state
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Name of the collection being scanned, if a scan is in flight
    pub fn current_collection(&self) -> Option<&str> {
        self.state.active_collection()
    }

    /// Advance the stream
    ///
    /// Emits chunks into `sink` until it pushes back, the stream ends, or the
    /// stream is cancelled. `size_hint` is advisory only: chunks are always
    /// cut at `batch_size` records.
    ///
    /// # Returns
    /// * `Result<PullOutcome>` - Why the pull stopped, or the fatal error
    pub async fn pull<K>(&mut self, size_hint: usize, sink: &mut K) -> Result<PullOutcome>
    where
        K: ChunkSink + ?Sized,
    {
        trace!("{}: pull (size hint {}) in {:?}", self.id, size_hint, self.phase);

        match self.phase {
            Phase::Done => return Ok(PullOutcome::Finished),
            Phase::Cancelled => return Ok(PullOutcome::Cancelled),
            Phase::Failed => return Err(StreamError::Terminated),
            Phase::Paused => {
                debug!("{}: resuming scan", self.id);
                self.phase = Phase::Scanning;
            }
            _ => {}
        }

        match self.drive(sink).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(self.fail(err).await),
        }
    }

    /// Cancel the stream
    ///
    /// Closes the open cursor and connection, then returns. The stream is
    /// terminal afterwards unless it had already finished or failed.
    pub async fn cancel(&mut self) -> Result<()> {
        if self.phase.is_terminal() {
            return Ok(());
        }

        self.warn_abandoned("cancellation");
        let released = self.release_resources().await;
        self.phase = Phase::Cancelled;
        info!("{}: stream cancelled", self.id);
        released
    }

    async fn drive<K>(&mut self, sink: &mut K) -> Result<PullOutcome>
    where
        K: ChunkSink + ?Sized,
    {
        loop {
            if self.is_cancelled() {
                return self.cancelled_by_token().await;
            }

            match self.phase {
                Phase::Idle => self.phase = Phase::Connecting,
                Phase::Connecting => {
                    if self.connect().await?.is_none() {
                        continue;
                    }
                    if self.open_current_collection().await?.is_none() {
                        continue;
                    }
                    self.phase = Phase::Scanning;
                }
                Phase::Scanning => {
                    if let Some(outcome) = self.scan_step(sink).await? {
                        return Ok(outcome);
                    }
                }
                Phase::Advancing => {
                    let next = self.state.collection_index + 1;
                    if next < self.config.collections().len() {
                        self.state.collection_index = next;
                        if self.open_current_collection().await?.is_none() {
                            continue;
                        }
                        self.phase = Phase::Scanning;
                    } else {
                        self.finish(sink).await?;
                        return Ok(PullOutcome::Finished);
                    }
                }
                Phase::Paused => return Ok(PullOutcome::Paused),
                Phase::Done => return Ok(PullOutcome::Finished),
                Phase::Cancelled => return Ok(PullOutcome::Cancelled),
                Phase::Failed => return Err(StreamError::Terminated),
            }
        }
    }

    /// Read one record from the active cursor
    ///
    /// # Returns
    /// * `Ok(Some(outcome))` - The pull must return
    /// * `Ok(None)` - Keep driving
    async fn scan_step<K>(&mut self, sink: &mut K) -> Result<Option<PullOutcome>>
    where
        K: ChunkSink + ?Sized,
    {
        let token = self.cancel_token.clone();
        let Some(cursor) = self.state.active_cursor.as_mut() else {
            return Err(CursorError::ReadFailed {
                collection: self.state.active_collection.clone().unwrap_or_default(),
                message: "no active cursor".to_string(),
            }
            .into());
        };

        // Cancelled mid-fetch: the next loop turn takes the cancellation path.
        let Some(record) = until_cancelled(token, cursor.next()).await else {
            return Ok(None);
        };

        match record? {
            Some(doc) => {
                self.state.pending_batch.push(doc);
                if self.state.pending_batch.len() >= self.config.batch_size()
                    && !self.emit_pending(sink)?
                {
                    self.phase = Phase::Paused;
                    debug!(
                        "{}: backpressure, pausing scan of '{}'",
                        self.id,
                        self.current_collection().unwrap_or_default()
                    );
                    return Ok(Some(PullOutcome::Paused));
                }
                Ok(None)
            }
            None => {
                let acknowledged =
                    self.state.pending_batch.is_empty() || self.emit_pending(sink)?;

                let collection = self.state.active_collection.take().unwrap_or_default();
                if let Some(mut cursor) = self.state.active_cursor.take() {
                    cursor.close().await?;
                }
                self.stats.collections_completed += 1;
                self.phase = Phase::Advancing;
                info!("{}: collection '{}' exhausted", self.id, collection);

                if acknowledged {
                    Ok(None)
                } else {
                    Ok(Some(PullOutcome::Paused))
                }
            }
        }
    }

    /// Encode and emit the pending batch, returning the sink's acknowledgement
    fn emit_pending<K>(&mut self, sink: &mut K) -> Result<bool>
    where
        K: ChunkSink + ?Sized,
    {
        let collection = self.state.active_collection.as_deref().unwrap_or_default();
        let chunk: Chunk = self
            .encoder
            .encode_batch(collection, &self.state.pending_batch)?;
        let count = chunk.record_count();
        self.state.pending_batch.clear();

        self.stats.records_emitted += count as u64;
        self.stats.chunks_emitted += 1;
        debug!(
            "{}: emitting chunk #{} with {} records from '{}'",
            self.id,
            self.stats.chunks_emitted,
            count,
            chunk.collection()
        );

        Ok(sink.push(chunk))
    }

    /// Open the connection; `None` means cancelled while connecting
    async fn connect(&mut self) -> Result<Option<()>> {
        info!("{}: connecting to {}", self.id, self.config.redacted_uri());

        let token = self.cancel_token.clone();
        let Some(connection) = until_cancelled(token, self.store.connect(self.config.uri())).await
        else {
            return Ok(None);
        };

        self.state.connection = Some(connection?);
        self.state.collection_index = 0;
        Ok(Some(()))
    }

    /// Open a cursor over the collection at the current index
    async fn open_current_collection(&mut self) -> Result<Option<()>> {
        let collection = self.collection_name()?;
        let token = self.cancel_token.clone();
        let connection = self
            .state
            .connection
            .as_ref()
            .ok_or(ConnectionError::NotConnected)?;

        let handle = connection.collection(&collection);
        let Some(cursor) = until_cancelled(token, handle.scan()).await else {
            return Ok(None);
        };

        self.state.active_cursor = Some(cursor?);
        info!(
            "{}: scanning collection '{}' ({}/{})",
            self.id,
            collection,
            self.state.collection_index + 1,
            self.config.collections().len()
        );
        self.state.active_collection = Some(collection);
        Ok(Some(()))
    }

    /// Signal the end of stream, then release the connection
    async fn finish<K>(&mut self, sink: &mut K) -> Result<()>
    where
        K: ChunkSink + ?Sized,
    {
        sink.end();
        self.phase = Phase::Done;
        info!(
            "{}: stream finished: {} records in {} chunks from {} collections",
            self.id,
            self.stats.records_emitted,
            self.stats.chunks_emitted,
            self.stats.collections_completed
        );
        self.release_resources().await
    }

    async fn cancelled_by_token(&mut self) -> Result<PullOutcome> {
        self.warn_abandoned("cancellation");
        let released = self.release_resources().await;
        self.phase = Phase::Cancelled;
        info!("{}: stream cancelled by token", self.id);
        released.map(|_| PullOutcome::Cancelled)
    }

    /// Release resources after a failure and settle the phase
    async fn fail(&mut self, err: StreamError) -> StreamError {
        self.warn_abandoned("error");
        if let Err(close_err) = self.release_resources().await {
            warn!("{}: cleanup after error failed: {}", self.id, close_err);
        }

        self.phase = match self.phase {
            // Everything was delivered; only the final close failed.
            Phase::Done => Phase::Done,
            Phase::Cancelled => Phase::Cancelled,
            _ if err.is_connection_error() && self.stats.chunks_emitted == 0 => Phase::Idle,
            _ => Phase::Failed,
        };
        warn!("{}: stream error ({:?}): {}", self.id, self.phase, err);
        err
    }

    /// Close cursor then connection, resetting the state
    ///
    /// Both are closed even if the first close fails; the first error wins.
    async fn release_resources(&mut self) -> Result<()> {
        let (connection, cursor) = self.state.reset();
        let mut result = Ok(());

        if let Some(mut cursor) = cursor {
            if let Err(e) = cursor.close().await {
                result = Err(e);
            }
        }
        if let Some(mut connection) = connection {
            match connection.close().await {
                Ok(()) => debug!("{}: connection closed", self.id),
                Err(e) => {
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }

    fn warn_abandoned(&self, reason: &str) {
        let pending = self.state.pending_len();
        if pending > 0 {
            warn!(
                "{}: abandoning {} buffered records on {}",
                self.id, pending, reason
            );
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    fn collection_name(&self) -> Result<String> {
        self.config
            .collections()
            .get(self.state.collection_index)
            .cloned()
            .ok_or_else(|| {
                CursorError::OpenFailed {
                    collection: format!("#{}", self.state.collection_index),
                    message: "collection index out of range".to_string(),
                }
                .into()
            })
    }
}

impl<S: DocumentStore> Drop for CollectionStream<S> {
    fn drop(&mut self) {
        if self.state.is_connected() || self.state.has_active_cursor() {
            warn!(
                "{}: dropped in {:?} with open resources; cancel() releases them cleanly",
                self.id, self.phase
            );
        }
    }
}

/// Await `fut` unless the token fires first
async fn until_cancelled<F, T>(token: Option<CancellationToken>, fut: F) -> Option<T>
where
    F: Future<Output = T>,
{
    match token {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                output = fut => Some(output),
            }
        }
        None => Some(fut.await),
    }
}
