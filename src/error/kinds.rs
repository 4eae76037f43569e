use std::{fmt, io};

/// Crate-wide `Result` type using [`StreamError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Top-level error type for collection streams.
///
/// Every failure surfaced by a stream, whether raised while validating the
/// configuration or while talking to the store, is one of these.
#[derive(Debug)]
pub enum StreamError {
    /// Connecting to (or disconnecting from) the store failed.
    Connection(ConnectionError),

    /// Opening, reading or closing a collection cursor failed.
    Cursor(CursorError),

    /// The configuration was rejected before any I/O took place.
    Config(ConfigError),

    /// A batch could not be encoded into a chunk.
    Encode(String),

    /// I/O errors.
    Io(io::Error),

    /// The stream already failed and cannot be pulled again.
    Terminated,
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// The connection descriptor could not be parsed.
    InvalidUri(String),

    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// The server did not answer the initial ping.
    PingFailed(String),

    /// An operation needed a connection but none is open.
    NotConnected,

    /// Closing the connection failed.
    CloseFailed(String),
}

/// Cursor-specific errors, always tied to the collection being scanned.
#[derive(Debug)]
pub enum CursorError {
    /// The scan over a collection could not be started.
    OpenFailed { collection: String, message: String },

    /// Reading the next record failed mid-scan.
    ReadFailed { collection: String, message: String },

    /// Releasing the cursor failed.
    CloseFailed { collection: String, message: String },
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// No collections were configured.
    EmptyCollections,

    /// Batch size must be a positive integer.
    InvalidBatchSize(usize),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),
}

impl StreamError {
    /// Whether the error came from establishing or tearing down a connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, StreamError::Connection(_))
    }

    /// Whether the error came from a collection cursor.
    pub fn is_cursor_error(&self) -> bool {
        matches!(self, StreamError::Cursor(_))
    }

    /// Whether the error was raised by configuration validation.
    pub fn is_config_error(&self) -> bool {
        matches!(self, StreamError::Config(_))
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Connection(e) => write!(f, "Connection error: {e}"),
            StreamError::Cursor(e) => write!(f, "Cursor error: {e}"),
            StreamError::Config(e) => write!(f, "Configuration error: {e}"),
            StreamError::Encode(msg) => write!(f, "Encoding error: {msg}"),
            StreamError::Io(e) => write!(f, "I/O error: {e}"),
            StreamError::Terminated => write!(f, "Stream terminated after a fatal error"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::InvalidUri(msg) => write!(f, "Invalid connection URI: {msg}"),
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::PingFailed(msg) => write!(f, "Ping failed: {msg}"),
            ConnectionError::NotConnected => write!(f, "Not connected to the store"),
            ConnectionError::CloseFailed(msg) => write!(f, "Failed to close connection: {msg}"),
        }
    }
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorError::OpenFailed {
                collection,
                message,
            } => write!(f, "Failed to open cursor on '{collection}': {message}"),
            CursorError::ReadFailed {
                collection,
                message,
            } => write!(f, "Failed to read from '{collection}': {message}"),
            CursorError::CloseFailed {
                collection,
                message,
            } => write!(f, "Failed to close cursor on '{collection}': {message}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyCollections => write!(f, "At least one collection is required"),
            ConfigError::InvalidBatchSize(size) => {
                write!(f, "Batch size must be positive, got {size}")
            }
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Connection(e) => Some(e),
            StreamError::Cursor(e) => Some(e),
            StreamError::Config(e) => Some(e),
            StreamError::Io(e) => Some(e),
            StreamError::Encode(_) | StreamError::Terminated => None,
        }
    }
}
impl std::error::Error for ConnectionError {}
impl std::error::Error for CursorError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to StreamError ========================= */

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        StreamError::Io(err)
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Encode(err.to_string())
    }
}

impl From<ConnectionError> for StreamError {
    fn from(err: ConnectionError) -> Self {
        StreamError::Connection(err)
    }
}

impl From<CursorError> for StreamError {
    fn from(err: CursorError) -> Self {
        StreamError::Cursor(err)
    }
}

impl From<ConfigError> for StreamError {
    fn from(err: ConfigError) -> Self {
        StreamError::Config(err)
    }
}
