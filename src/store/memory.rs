//! In-process document store
//!
//! `MemoryStore` implements the store traits over plain vectors of
//! documents. Besides serving records it records every lifecycle event
//! (connect, scan, fetch, close) and can be told to fail at any step, which
//! makes it the harness for exercising the stream engine's error and
//! cleanup paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bson::Document;
use tracing::trace;

use super::{CollectionHandle, DocumentStore, RecordCursor, StoreConnection};
use crate::config::{SCHEME_SRV, SCHEME_STANDARD};
use crate::error::{ConnectionError, CursorError, Result};

/// A lifecycle event observed by a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Connected { uri: String },
    ConnectionClosed,
    ScanOpened { collection: String },
    RecordFetched { collection: String },
    CursorClosed { collection: String },
}

#[derive(Debug, Default)]
struct Faults {
    refuse_connections: Option<String>,
    stall_connections: bool,
    fail_open: HashSet<String>,
    fail_read_after: HashMap<String, usize>,
    stall_read_after: HashMap<String, usize>,
    fail_cursor_close: bool,
    fail_connection_close: bool,
}

#[derive(Debug, Default)]
struct Inner {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    faults: Mutex<Faults>,
    events: Mutex<Vec<StoreEvent>>,
}

/// Document store held entirely in memory
///
/// Cloning is cheap and clones share data, fault settings and the event log,
/// so a test can keep one clone for inspection while a stream owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a collection
    pub fn with_collection(self, name: impl Into<String>, records: Vec<Document>) -> Self {
        self.insert(name, records);
        self
    }

    /// Add (or replace) a collection in place
    pub fn insert(&self, name: impl Into<String>, records: Vec<Document>) {
        lock(&self.inner.collections).insert(name.into(), records);
    }

    /// Make every connection attempt fail with `message`
    pub fn refuse_connections(&self, message: impl Into<String>) {
        lock(&self.inner.faults).refuse_connections = Some(message.into());
    }

    /// Accept connections again
    pub fn accept_connections(&self) {
        lock(&self.inner.faults).refuse_connections = None;
    }

    /// Make connection attempts hang forever
    pub fn stall_connections(&self) {
        lock(&self.inner.faults).stall_connections = true;
    }

    /// Make scans of `collection` fail to open
    pub fn fail_open(&self, collection: impl Into<String>) {
        lock(&self.inner.faults).fail_open.insert(collection.into());
    }

    /// Make cursors over `collection` fail after yielding `records` records
    pub fn fail_read_after(&self, collection: impl Into<String>, records: usize) {
        lock(&self.inner.faults)
            .fail_read_after
            .insert(collection.into(), records);
    }

    /// Make cursors over `collection` hang forever after yielding `records` records
    pub fn stall_read_after(&self, collection: impl Into<String>, records: usize) {
        lock(&self.inner.faults)
            .stall_read_after
            .insert(collection.into(), records);
    }

    /// Make cursor close report an error (the cursor is still released)
    pub fn fail_cursor_close(&self) {
        lock(&self.inner.faults).fail_cursor_close = true;
    }

    /// Make connection close report an error (the connection is still released)
    pub fn fail_connection_close(&self) {
        lock(&self.inner.faults).fail_connection_close = true;
    }

    /// Every event recorded so far, in order
    pub fn events(&self) -> Vec<StoreEvent> {
        lock(&self.inner.events).clone()
    }

    /// Number of records handed out by cursors
    pub fn fetch_count(&self) -> usize {
        lock(&self.inner.events)
            .iter()
            .filter(|e| matches!(e, StoreEvent::RecordFetched { .. }))
            .count()
    }

    /// Connections opened and not yet closed
    pub fn open_connections(&self) -> usize {
        let events = lock(&self.inner.events);
        let opened = events
            .iter()
            .filter(|e| matches!(e, StoreEvent::Connected { .. }))
            .count();
        let closed = events
            .iter()
            .filter(|e| matches!(e, StoreEvent::ConnectionClosed))
            .count();
        opened - closed
    }

    /// Cursors opened and not yet closed
    pub fn open_cursors(&self) -> usize {
        let events = lock(&self.inner.events);
        let opened = events
            .iter()
            .filter(|e| matches!(e, StoreEvent::ScanOpened { .. }))
            .count();
        let closed = events
            .iter()
            .filter(|e| matches!(e, StoreEvent::CursorClosed { .. }))
            .count();
        opened - closed
    }

    fn record(&self, event: StoreEvent) {
        trace!("memory store event: {:?}", event);
        lock(&self.inner.events).push(event);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    type Connection = MemoryConnection;

    async fn connect(&self, uri: &str) -> Result<MemoryConnection> {
        let valid_scheme = [SCHEME_STANDARD, SCHEME_SRV]
            .iter()
            .any(|scheme| uri.starts_with(&format!("{scheme}://")));
        if !valid_scheme {
            return Err(ConnectionError::InvalidUri(uri.to_string()).into());
        }

        let stall = {
            let faults = lock(&self.inner.faults);
            if let Some(message) = faults.refuse_connections.clone() {
                return Err(ConnectionError::ConnectionFailed(message).into());
            }
            faults.stall_connections
        };
        if stall {
            futures::future::pending::<()>().await;
        }

        self.record(StoreEvent::Connected {
            uri: uri.to_string(),
        });

        Ok(MemoryConnection {
            store: self.clone(),
            closed: false,
        })
    }
}

/// Connection to a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryConnection {
    store: MemoryStore,
    closed: bool,
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    type Collection = MemoryCollection;

    fn collection(&self, name: &str) -> MemoryCollection {
        MemoryCollection {
            store: self.store.clone(),
            name: name.to_string(),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.store.record(StoreEvent::ConnectionClosed);

        if lock(&self.store.inner.faults).fail_connection_close {
            return Err(ConnectionError::CloseFailed("injected close failure".to_string()).into());
        }
        Ok(())
    }
}

/// Collection handle of a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryCollection {
    store: MemoryStore,
    name: String,
}

#[async_trait]
impl CollectionHandle for MemoryCollection {
    type Cursor = MemoryCursor;

    fn name(&self) -> &str {
        &self.name
    }

    async fn scan(&self) -> Result<MemoryCursor> {
        let (fail_after, stall_after) = {
            let faults = lock(&self.store.inner.faults);
            if faults.fail_open.contains(&self.name) {
                return Err(CursorError::OpenFailed {
                    collection: self.name.clone(),
                    message: "injected open failure".to_string(),
                }
                .into());
            }
            (
                faults.fail_read_after.get(&self.name).copied(),
                faults.stall_read_after.get(&self.name).copied(),
            )
        };

        // A missing collection scans as empty, as it does on a real server.
        let records = lock(&self.store.inner.collections)
            .get(&self.name)
            .cloned()
            .unwrap_or_default();

        self.store.record(StoreEvent::ScanOpened {
            collection: self.name.clone(),
        });

        Ok(MemoryCursor {
            store: self.store.clone(),
            collection: self.name.clone(),
            records,
            position: 0,
            fail_after,
            stall_after,
            closed: false,
        })
    }
}

/// Cursor over a snapshot of a [`MemoryStore`] collection
#[derive(Debug)]
pub struct MemoryCursor {
    store: MemoryStore,
    collection: String,
    records: Vec<Document>,
    position: usize,
    fail_after: Option<usize>,
    stall_after: Option<usize>,
    closed: bool,
}

#[async_trait]
impl RecordCursor for MemoryCursor {
    async fn next(&mut self) -> Result<Option<Document>> {
        if self.closed {
            return Ok(None);
        }
        if self.fail_after == Some(self.position) {
            return Err(CursorError::ReadFailed {
                collection: self.collection.clone(),
                message: "injected read failure".to_string(),
            }
            .into());
        }
        if self.stall_after == Some(self.position) {
            futures::future::pending::<()>().await;
        }

        let Some(record) = self.records.get(self.position).cloned() else {
            return Ok(None);
        };
        self.position += 1;
        self.store.record(StoreEvent::RecordFetched {
            collection: self.collection.clone(),
        });
        Ok(Some(record))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.store.record(StoreEvent::CursorClosed {
            collection: self.collection.clone(),
        });

        if lock(&self.store.inner.faults).fail_cursor_close {
            return Err(CursorError::CloseFailed {
                collection: self.collection.clone(),
                message: "injected close failure".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
