//! Trace decoding errors.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;

/// Fatal trace-stream error. The reader does not resynchronize after one.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Record tag outside the known set.
    #[error("unknown record tag 0x{tag:02x} at offset {offset}")]
    UnknownRecord {
        /// Raw tag byte.
        tag: u8,
        /// Offset of the tag byte.
        offset: u64,
    },
    /// Stream ended inside a record.
    #[error("truncated record (tag 0x{tag:02x}) at offset {offset}")]
    Truncated {
        /// Tag of the incomplete record.
        tag: u8,
        /// Offset of the tag byte.
        offset: u64,
    },
    /// Underlying read failure.
    #[error("trace read failed: {0}")]
    Io(#[from] io::Error),
    /// Reader configuration rejected.
    #[error("invalid reader configuration: {0}")]
    Config(#[from] ConfigError),
}

impl TraceError {
    /// Maps a record-body read failure, turning an early end of stream into
    /// [`TraceError::Truncated`].
    #[must_use]
    pub fn from_record(error: io::Error, tag: u8, offset: u64) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated { tag, offset }
        } else {
            Self::Io(error)
        }
    }
}
