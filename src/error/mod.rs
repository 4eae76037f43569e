//! Error handling for collection streams.
//!
//! This module provides:
//! - A single top-level [`StreamError`] wrapping connection, cursor and
//!   configuration failures
//! - Structured error information extracted from MongoDB driver errors
//!
//! # Example
//!
//! ```rust
//! use collection_stream::error::{ConfigError, Result, StreamError};
//!
//! fn validate(batch_size: usize) -> Result<()> {
//!     if batch_size == 0 {
//!         return Err(ConfigError::InvalidBatchSize(batch_size).into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(matches!(validate(0), Err(StreamError::Config(_))));
//! ```

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{ConfigError, ConnectionError, CursorError, Result, StreamError};
pub use mongo::{ErrorInfo, extract_error_info};
