//! Error types for riffkit-io.

use crate::FourCC;
use std::io;
use thiserror::Error;

/// Result type for riffkit-io operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for riffkit-io operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying source or sink.
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// The source yielded fewer bytes than declared or requested.
    #[error("Unexpected end of stream: expected {missing} more byte(s) after position {position}")]
    Truncated { missing: u64, position: u64 },

    /// A chunk tag is not four ASCII bytes.
    #[error("Invalid chunk tag: {0:02x?}")]
    InvalidTag([u8; 4]),

    /// A chunk carries a different tag than the caller requires.
    #[error("Unexpected chunk tag: {found} != {expected}")]
    UnexpectedTag { found: FourCC, expected: FourCC },

    /// Structurally invalid chunk layout.
    #[error("Malformed chunk: {0}")]
    Malformed(String),

    /// Operation not supported by this kind of stream.
    #[error("Unsupported: {0}")]
    Unsupported(&'static str),

    /// The underlying source has been closed.
    #[error("Stream closed")]
    Closed,

    /// A seek was required but the source is forward-only.
    #[error("Stream is not seekable")]
    NotSeekable,

    /// Payload was already partially or fully consumed.
    #[error("Chunk payload already consumed (position {position} of {size})")]
    AlreadyConsumed { position: u32, size: u32 },

    /// Pad byte requested before the payload was fully consumed.
    #[error("Chunk payload not fully consumed ({remaining} byte(s) left)")]
    PayloadNotConsumed { remaining: u32 },

    /// A subchunk claims more bytes than its parent has left.
    #[error("Chunk {tag} needs {needed} byte(s) but parent has {remaining} left")]
    ChunkOverflowsParent {
        tag: FourCC,
        needed: u64,
        remaining: u64,
    },

    /// Size arithmetic exceeded the representable range.
    #[error("Size overflow: {0}")]
    SizeOverflow(String),
}

impl Error {
    /// Create a truncation error.
    pub fn truncated(missing: u64, position: u64) -> Self {
        Self::Truncated { missing, position }
    }

    /// Create a malformed chunk error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Create a size overflow error.
    pub fn size_overflow(msg: impl Into<String>) -> Self {
        Self::SizeOverflow(msg.into())
    }

    /// Check if this is a truncation error.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::Io(e) => e.kind(),
            Self::Truncated { .. } => io::ErrorKind::UnexpectedEof,
            Self::InvalidTag(_) | Self::UnexpectedTag { .. } | Self::Malformed(_) => {
                io::ErrorKind::InvalidData
            }
            Self::ChunkOverflowsParent { .. } | Self::SizeOverflow(_) => {
                io::ErrorKind::InvalidData
            }
            Self::Unsupported(_) | Self::NotSeekable => io::ErrorKind::Unsupported,
            Self::AlreadyConsumed { .. } | Self::PayloadNotConsumed { .. } => {
                io::ErrorKind::InvalidInput
            }
            Self::Closed => io::ErrorKind::BrokenPipe,
        }
    }
}

// Core errors travel through `std::io::Read`/`Seek` impls wrapped in an
// `io::Error`; this unwraps them again so callers see the typed variant.
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(typed) => typed,
            Err(err) => Self::Io(err),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            other => io::Error::new(other.io_kind(), other),
        }
    }
}
