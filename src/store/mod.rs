//! Store client adapter seam
//!
//! The stream engine never talks to a driver directly. It drives these
//! traits, which mirror the four capabilities it needs from a document store:
//!
//! 1. **DocumentStore**: open a connection from a connection descriptor
//! 2. **StoreConnection**: hand out collection handles, close the connection
//! 3. **CollectionHandle**: start an unfiltered scan
//! 4. **RecordCursor**: yield records one at a time, close the scan
//!
//! [`crate::connection::MongoStore`] implements them on top of the MongoDB
//! driver; [`memory::MemoryStore`] implements them in process.
//!
//! Cursors are pull-driven: a cursor that is not asked for its next record
//! performs no I/O, which is what lets a paused stream stay quiet.

use async_trait::async_trait;
use bson::Document;

use crate::error::Result;

pub mod memory;

pub use memory::{MemoryStore, StoreEvent};

/// Entry point of a document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open connection type
    type Connection: StoreConnection;

    /// Open a connection
    ///
    /// # Arguments
    /// * `uri` - Connection descriptor
    ///
    /// # Returns
    /// * `Result<Self::Connection>` - Open connection or a `ConnectionError`
    async fn connect(&self, uri: &str) -> Result<Self::Connection>;
}

/// An open connection to a document store
#[async_trait]
pub trait StoreConnection: Send + Sync {
    /// Collection handle type
    type Collection: CollectionHandle;

    /// Get a handle to a named collection
    fn collection(&self, name: &str) -> Self::Collection;

    /// Close the connection and release its resources
    async fn close(&mut self) -> Result<()>;
}

/// A handle to one collection
#[async_trait]
pub trait CollectionHandle: Send + Sync {
    /// Cursor type produced by a scan
    type Cursor: RecordCursor;

    /// Collection name
    fn name(&self) -> &str;

    /// Start an unfiltered scan in natural order
    async fn scan(&self) -> Result<Self::Cursor>;
}

/// A server-side iterator over a collection's records
#[async_trait]
pub trait RecordCursor: Send {
    /// Fetch the next record, or `None` once the cursor is exhausted
    async fn next(&mut self) -> Result<Option<Document>>;

    /// Release the cursor. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Connection type of a store
pub type ConnectionOf<S> = <S as DocumentStore>::Connection;

/// Collection handle type of a store
pub type CollectionOf<S> = <ConnectionOf<S> as StoreConnection>::Collection;

/// Cursor type of a store
pub type CursorOf<S> = <CollectionOf<S> as CollectionHandle>::Cursor;
