//! Reader error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for read operations
pub type ReadResult<T> = Result<T, ReadError>;

/// Read failures surfaced to the caller.
///
/// Malformed lines are not errors; they are skipped during decoding. A
/// missing storage root is an empty store, not an error.
#[derive(Debug, Error)]
pub enum ReadError {
    /// A date filter could not be parsed. Raised before any filesystem
    /// scan begins; no partial results are produced.
    #[error("invalid date filter {value:?}: expected YYYY-MM-DD")]
    InvalidDateFilter { value: String },

    /// The store exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
