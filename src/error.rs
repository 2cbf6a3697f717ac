//! Error types for table operations and the binary codec.

use thiserror::Error;

/// Failures while encoding or decoding the binary format.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("insufficient data: needed {needed} bytes, only {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("unknown byte array marker {0:#06x}")]
    BadMarker(u16),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("no type registered for index {0}")]
    UnknownType(i16),
    #[error("type `{0}` is not registered and cannot be encoded")]
    Unregistered(&'static str),
    #[error("value does not match type `{0}`")]
    TypeMismatch(&'static str),
    #[error("invalid UTF-8 in string data")]
    InvalidUtf8,
    #[error("expected {expected} entries, decoded {decoded}")]
    Incomplete { expected: u64, decoded: u64 },
    #[error("nesting deeper than {0} levels")]
    TooDeep(u16),
}

/// Failures of table operations.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("key does not match key type `{0}`")]
    KeyType(&'static str),
    #[error("value does not match value type `{0}`")]
    ValueType(&'static str),
    #[error("table is already borrowed by this thread")]
    Busy,
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error("malformed JSON input: {0}")]
    Json(String),
}

pub type Result<T, E = TableError> = core::result::Result<T, E>;
