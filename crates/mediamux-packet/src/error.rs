//! Error types for mediamux-packet.

use std::io;
use thiserror::Error;

/// Result type for mediamux-packet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for mediamux-packet operations.
///
/// Packet bookkeeping itself never fails; these come from loading external
/// timestamp sources.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The timestamp file does not start with a format header.
    #[error("Missing timestamp format header")]
    MissingHeader,

    /// The timestamp file uses a format version that is not supported.
    #[error("Unsupported timestamp format: v{0}")]
    UnsupportedFormat(u32),

    /// A line of the timestamp file could not be parsed.
    #[error("Timestamp file line {line}: {message}")]
    TimestampFile { line: usize, message: String },
}

impl Error {
    /// Create a timestamp file error for a 1-based line number.
    pub fn timestamp_file(line: usize, message: impl Into<String>) -> Self {
        Self::TimestampFile {
            line,
            message: message.into(),
        }
    }
}
