//! Error types for geoasn.

use thiserror::Error;

/// Error type for geoasn operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level download failure
    #[error("download error: {0}")]
    Fetch(String),

    /// Server answered with a non-success status
    #[error("download failed: HTTP {0}")]
    HttpStatus(u16),

    /// Body ended before the announced length
    #[error("truncated download: expected {expected} bytes, got {actual}")]
    Truncated { expected: u64, actual: u64 },

    /// Database could not be opened or decoded
    #[error("database error: {0}")]
    Database(String),

    /// Database would not fit in 24-bit search tree records
    #[error("database too large for 24-bit records: {0} pointers needed")]
    DatabaseTooLarge(usize),

    /// Malformed source CSV row
    #[error("invalid record on line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for geoasn operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<maxminddb::MaxMindDBError> for Error {
    fn from(e: maxminddb::MaxMindDBError) -> Self {
        Error::Database(e.to_string())
    }
}

/// Reason a query could not produce an answer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    /// No database has been installed yet
    #[error("database not ready")]
    NotReady,

    /// Input is not an IPv4 or IPv6 address
    #[error("invalid IP address")]
    InvalidAddress,

    /// Lookup failed or no network covers the address
    #[error("lookup failed")]
    Lookup,
}

impl QueryError {
    /// Machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::NotReady => "db_not_ready",
            QueryError::InvalidAddress => "invalid_ip",
            QueryError::Lookup => "internal_error",
        }
    }
}
