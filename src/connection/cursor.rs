//! Record-at-a-time cursor over a MongoDB collection
//!
//! The driver cursor buffers one server batch and only issues `getMore`
//! when that buffer is drained and the cursor is polled again. Not calling
//! `next` therefore suspends all network activity for the scan.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::Cursor;
use mongodb::bson::Document;
use tracing::debug;

use crate::error::{CursorError, Result, extract_error_info};
use crate::store::RecordCursor;

/// Cursor-based record source for one collection
pub struct MongoCursor {
    cursor: Option<Cursor<Document>>,
    collection: String,
    total_fetched: u64,
    closed: bool,
}

impl MongoCursor {
    /// Wrap a driver cursor
    ///
    /// # Arguments
    /// * `cursor` - MongoDB cursor from a find operation
    /// * `collection` - Collection name, for errors and logging
    pub fn new(cursor: Cursor<Document>, collection: &str) -> Self {
        Self {
            cursor: Some(cursor),
            collection: collection.to_string(),
            total_fetched: 0,
            closed: false,
        }
    }
}

#[async_trait]
impl RecordCursor for MongoCursor {
    async fn next(&mut self) -> Result<Option<Document>> {
        if self.closed {
            return Ok(None);
        }

        let cursor = match self.cursor.as_mut() {
            Some(c) => c,
            None => return Ok(None),
        };

        match cursor.try_next().await {
            Ok(Some(doc)) => {
                self.total_fetched += 1;
                Ok(Some(doc))
            }
            Ok(None) => {
                debug!(
                    "Cursor on '{}' exhausted after {} documents",
                    self.collection, self.total_fetched
                );
                Ok(None)
            }
            Err(e) => {
                // On error, drop cursor to release server resources
                self.cursor = None;
                self.closed = true;
                let info = extract_error_info(&e);
                if let Ok(details) = info.to_json_compact() {
                    debug!("Read on '{}' failed: {}", self.collection, details);
                }
                Err(CursorError::ReadFailed {
                    collection: self.collection.clone(),
                    message: info.summary(),
                }
                .into())
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            // Dropping the driver cursor kills it on the server if still open
            self.cursor = None;
            self.closed = true;
            debug!(
                "Closed cursor on '{}' after fetching {} documents",
                self.collection, self.total_fetched
            );
        }
        Ok(())
    }
}

impl Drop for MongoCursor {
    fn drop(&mut self) {
        if !self.closed {
            debug!("MongoCursor on '{}' dropped without explicit close", self.collection);
            self.cursor = None;
        }
    }
}
