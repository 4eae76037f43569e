//! Collection Stream Library
//!
//! This library exposes a pull-based, backpressure-aware stream over a list
//! of MongoDB collections. Each pull connects if needed, drains the current
//! collection's cursor into fixed-size batches, emits each batch as one
//! JSON-encoded chunk, moves on to the next collection when the cursor is
//! exhausted, and signals the end of stream once every collection is done.
//!
//! # Modules
//!
//! - `codec`: Record and chunk encoding
//! - `config`: Configuration management
//! - `connection`: MongoDB store adapter
//! - `error`: Error types and handling
//! - `logging`: Subscriber setup
//! - `store`: Store traits and the in-memory store
//! - `stream`: The stream engine
//!
//! # Example
//!
//! ```no_run
//! use collection_stream::{ChunkBuffer, CollectionStream, PullOutcome, StreamConfig, StreamOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = StreamOptions::new("localhost", "streamableDb")
//!         .with_credentials("user", "123456")
//!         .with_collections(["cars", "restaurants", "users"]);
//!
//!     let mut stream = CollectionStream::mongodb(StreamConfig::new(options)?);
//!     let mut buffer = ChunkBuffer::new(4);
//!
//!     loop {
//!         let outcome = stream.pull(4, &mut buffer).await?;
//!         for chunk in buffer.drain() {
//!             println!("{}: {} records", chunk.collection(), chunk.record_count());
//!         }
//!         if outcome != PullOutcome::Paused {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod store;
pub mod stream;

// Re-export commonly used types
pub use codec::{Chunk, RecordEncoder};
pub use config::{RecordEncoding, StreamConfig, StreamOptions};
pub use connection::MongoStore;
pub use error::{Result, StreamError};
pub use logging::init_logging;
pub use store::{DocumentStore, MemoryStore};
pub use stream::{ChunkBuffer, ChunkSink, CollectionStream, Phase, PullOutcome, StreamStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
