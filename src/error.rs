//! Error types for the matcher core and for candidate production.

use std::io;

use thiserror::Error;

/// Invalid-argument errors raised synchronously by the scanner and matcher.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The matcher was configured with a zero result limit
    #[error("limit must be greater than zero")]
    InvalidLimit,
    /// The matcher was configured with zero worker threads
    #[error("thread count must be greater than zero")]
    InvalidThreadCount,
    /// A candidate index past the end of the scanner
    #[error("candidate index {index} out of range (scanner holds {count} candidates)")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of candidates in the scanner
        count: usize,
    },
    /// A candidate span that does not fit inside the adopted buffer
    #[error("span #{index} ({start}+{len}) lies outside of a {buffer_len} byte buffer")]
    InvalidSpan {
        /// Position of the offending span in the span list
        index: usize,
        /// Byte offset of the span
        start: usize,
        /// Byte length of the span
        len: usize,
        /// Size of the buffer the span points into
        buffer_len: usize,
    },
}

/// Failures while producing candidates.
///
/// These never abort candidate production: they travel alongside whatever
/// was collected before the failure, see [`crate::reader::ScanResult`].
#[derive(Debug, Error)]
pub enum ScanError {
    /// The external command could not be started
    #[error("could not spawn command: {0}")]
    Spawn(#[source] io::Error),
    /// Reading candidate data failed part way through
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
    /// Walking a directory tree failed
    #[error("directory walk failed: {0}")]
    Walk(String),
    /// An entry was shorter than the prefix asked to be dropped from it
    #[error("entry of {len} bytes is too short to drop {drop} bytes")]
    DropExceedsEntry {
        /// Number of bytes to drop from every entry
        drop: usize,
        /// Length of the offending entry
        len: usize,
    },
    /// The external command exited unsuccessfully
    #[error("command exited with {0}")]
    CommandFailed(String),
    /// The collected candidates could not be turned into a scanner
    #[error(transparent)]
    Layout(#[from] MatchError),
}

impl From<ignore::Error> for ScanError {
    fn from(err: ignore::Error) -> Self {
        ScanError::Walk(err.to_string())
    }
}
