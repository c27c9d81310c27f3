//! Compaction error types
//!
//! Any failure aborts the run before the source partitions are deleted;
//! the host scheduler sees the error and retries on its next cadence.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for compaction operations
pub type CompactResult<T> = Result<T, CompactError>;

/// Compaction failures.
#[derive(Debug, Error)]
pub enum CompactError {
    /// The storage root exists but could not be listed.
    #[error("failed to scan log directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The archive staging file could not be created.
    #[error("failed to create archive {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A selected partition could not be copied into the archive.
    #[error("failed to add partition {name} to archive: {source}")]
    Member {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The finished archive could not be flushed or moved into place.
    #[error("failed to finalize archive {path}: {source}")]
    Finalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An archived partition could not be removed. The archive is
    /// already in place; a rerun rebuilds it and retries the removal.
    #[error("failed to remove archived partition {name}: {source}")]
    Cleanup {
        name: String,
        #[source]
        source: io::Error,
    },
}
