//! Chunk encoding
//!
//! A chunk is the byte encoding of a JSON array whose elements are the
//! JSON-encoded records of one batch:
//!
//! ```text
//! ["{\"_id\":\"...\",\"make\":\"Volvo\"}","{\"_id\":\"...\",\"make\":\"Saab\"}"]
//! ```
//!
//! Every chunk is self-contained: it can be decoded without any other chunk
//! of the stream.

mod json;

pub use json::JsonConverter;

use bson::{Bson, Document};
use serde_json::Value as JsonValue;

use crate::config::RecordEncoding;
use crate::error::{Result, StreamError};

/// One emitted unit of a collection stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    collection: String,
    record_count: usize,
    bytes: Vec<u8>,
}

impl Chunk {
    /// Collection the records were read from
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Number of records in the chunk
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Decode the chunk back into one JSON value per record
    pub fn decode(&self) -> Result<Vec<JsonValue>> {
        decode_chunk(&self.bytes)
    }
}

/// Decode chunk bytes into one JSON value per record
pub fn decode_chunk(bytes: &[u8]) -> Result<Vec<JsonValue>> {
    let encoded: Vec<String> = serde_json::from_slice(bytes)?;
    encoded
        .iter()
        .map(|record| serde_json::from_str(record).map_err(StreamError::from))
        .collect()
}

/// Encodes batches of records into chunks
#[derive(Debug, Clone, Copy)]
pub struct RecordEncoder {
    encoding: RecordEncoding,
    converter: JsonConverter,
}

impl RecordEncoder {
    /// Create an encoder for the given per-record encoding
    pub fn new(encoding: RecordEncoding) -> Self {
        Self {
            encoding,
            converter: JsonConverter::simplified(),
        }
    }

    /// Render one record as JSON text
    pub fn encode_record(&self, doc: &Document) -> Result<String> {
        let value = match self.encoding {
            RecordEncoding::Simplified => self.converter.convert_document(doc),
            RecordEncoding::Relaxed => Bson::Document(doc.clone()).into_relaxed_extjson(),
            RecordEncoding::Canonical => Bson::Document(doc.clone()).into_canonical_extjson(),
        };
        Ok(serde_json::to_string(&value)?)
    }

    /// Encode a batch read from `collection` into a chunk
    ///
    /// # Arguments
    /// * `collection` - Source collection name, carried as chunk metadata
    /// * `records` - Records in cursor order; must not be empty
    pub fn encode_batch(&self, collection: &str, records: &[Document]) -> Result<Chunk> {
        if records.is_empty() {
            return Err(StreamError::Encode(format!(
                "refusing to encode an empty batch from '{collection}'"
            )));
        }

        let encoded = records
            .iter()
            .map(|doc| self.encode_record(doc))
            .collect::<Result<Vec<String>>>()?;

        Ok(Chunk {
            collection: collection.to_string(),
            record_count: records.len(),
            bytes: serde_json::to_vec(&encoded)?,
        })
    }
}

impl Default for RecordEncoder {
    fn default() -> Self {
        Self::new(RecordEncoding::default())
    }
}
