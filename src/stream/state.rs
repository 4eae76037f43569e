//! Per-stream mutable state

use bson::Document;

use crate::store::{ConnectionOf, CursorOf, DocumentStore};

/// Where a stream is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No connection; the next pull connects
    Idle,

    /// Opening the connection and the first cursor
    Connecting,

    /// Cursor open, records being drained into batches
    Scanning,

    /// Cursor open, consumer applied backpressure
    Paused,

    /// Between collections
    Advancing,

    /// Every collection exhausted and end of stream signalled
    Done,

    /// A fatal error ended the stream
    Failed,

    /// The consumer cancelled the stream
    Cancelled,
}

impl Phase {
    /// Whether no further chunks can ever be produced
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed | Phase::Cancelled)
    }
}

/// Mutable state owned by exactly one stream
///
/// `connection` and `active_cursor` are the only resources a stream holds;
/// `collection_index` returns to 0 whenever the connection is dropped.
pub struct StreamState<S: DocumentStore> {
    pub(crate) connection: Option<ConnectionOf<S>>,
    pub(crate) collection_index: usize,
    pub(crate) active_cursor: Option<CursorOf<S>>,
    /// Name of the collection `active_cursor` reads from
    pub(crate) active_collection: Option<String>,
    pub(crate) pending_batch: Vec<Document>,
}

impl<S: DocumentStore> StreamState<S> {
    /// Create the initial, empty state
    pub fn new(batch_size: usize) -> Self {
        Self {
            connection: None,
            collection_index: 0,
            active_cursor: None,
            active_collection: None,
            pending_batch: Vec::with_capacity(batch_size),
        }
    }

    /// Whether a connection is open
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Index of the collection being (or about to be) scanned
    pub fn collection_index(&self) -> usize {
        self.collection_index
    }

    /// Whether a cursor is open
    pub fn has_active_cursor(&self) -> bool {
        self.active_cursor.is_some()
    }

    /// Collection the open cursor reads from
    pub fn active_collection(&self) -> Option<&str> {
        self.active_collection.as_deref()
    }

    /// Records read but not yet emitted
    pub fn pending_len(&self) -> usize {
        self.pending_batch.len()
    }

    /// Whether the state holds its initial values
    pub fn is_initial(&self) -> bool {
        self.connection.is_none()
            && self.active_cursor.is_none()
            && self.active_collection.is_none()
            && self.collection_index == 0
            && self.pending_batch.is_empty()
    }

    /// Return to the initial values, handing back any open resources
    ///
    /// The caller is responsible for closing what it gets back.
    pub(crate) fn reset(&mut self) -> (Option<ConnectionOf<S>>, Option<CursorOf<S>>) {
        self.collection_index = 0;
        self.pending_batch.clear();
        self.active_collection = None;
        (self.connection.take(), self.active_cursor.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use bson::doc;

    #[test]
    fn test_terminal_phases() {
        assert!(Phase::Done.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(Phase::Cancelled.is_terminal());
        assert!(!Phase::Paused.is_terminal());
        assert!(!Phase::Idle.is_terminal());
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let mut state: StreamState<MemoryStore> = StreamState::new(5);
        assert!(state.is_initial());

        state.collection_index = 2;
        state.active_collection = Some("restaurants".to_string());
        state.pending_batch.push(doc! { "n": 1 });
        assert!(!state.is_initial());

        let (connection, cursor) = state.reset();
        assert!(connection.is_none());
        assert!(cursor.is_none());
        assert!(state.is_initial());
        assert_eq!(state.active_collection(), None);
    }
}
