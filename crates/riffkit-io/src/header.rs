//! Chunk tags and the fixed 8-byte chunk header.

use crate::source::{read_array, Source};
use crate::{Error, Result};
use std::io::Write;
use std::str::FromStr;

/// Size of an encoded chunk header.
pub const HEADER_SIZE: u32 = 8;

/// Four-character chunk tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FourCC([u8; 4]);

impl FourCC {
    pub const RIFF: Self = Self(*b"RIFF");
    pub const LIST: Self = Self(*b"LIST");
    pub const WAVE: Self = Self(*b"WAVE");
    pub const AVI: Self = Self(*b"AVI ");
    pub const INFO: Self = Self(*b"INFO");
    pub const FMT: Self = Self(*b"fmt ");
    pub const DATA: Self = Self(*b"data");

    /// Create from bytes, rejecting anything that is not ASCII.
    pub fn new(bytes: [u8; 4]) -> Result<Self> {
        if bytes.is_ascii() {
            Ok(Self(bytes))
        } else {
            Err(Error::InvalidTag(bytes))
        }
    }

    /// Raw tag bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// The tag as a string slice.
    pub fn as_str(&self) -> &str {
        // ASCII is checked on construction
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// Check if chunks with this tag carry a format tag and subchunks.
    pub fn is_container(&self) -> bool {
        matches!(*self, Self::RIFF | Self::LIST)
    }
}

impl FromStr for FourCC {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; 4] = s.as_bytes().try_into().map_err(|_| {
            let mut padded = [b'?'; 4];
            for (dst, src) in padded.iter_mut().zip(s.bytes()) {
                *dst = src;
            }
            Error::InvalidTag(padded)
        })?;
        Self::new(bytes)
    }
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PartialEq<&str> for FourCC {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_slice() == other.as_bytes()
    }
}

/// Parsed chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Chunk tag.
    pub tag: FourCC,
    /// Payload length, excluding header and pad byte.
    pub size: u32,
}

impl ChunkHeader {
    /// Create a header.
    pub fn new(tag: FourCC, size: u32) -> Self {
        Self { tag, size }
    }

    /// Read a header: the tag, then the little-endian size.
    ///
    /// Each field is read on its own so a truncation reports the bytes
    /// missing from that field.
    pub fn parse<S: Source + ?Sized>(source: &mut S) -> Result<Self> {
        let tag = FourCC::new(read_array::<4, S>(source)?)?;
        let size = u32::from_le_bytes(read_array::<4, S>(source)?);
        tracing::trace!(%tag, size, "Parsed chunk header");
        Ok(Self { tag, size })
    }

    /// Encode into the 8-byte wire form.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(self.tag.as_bytes());
        out[4..].copy_from_slice(&self.size.to_le_bytes());
        out
    }

    /// Write the 8-byte wire form.
    pub fn write_to<W: Write + ?Sized>(&self, sink: &mut W) -> Result<()> {
        sink.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Whether the payload is followed by a pad byte.
    pub fn is_padded(&self) -> bool {
        self.size % 2 != 0
    }

    /// Header, payload and pad byte together.
    pub fn total_encoded_size(&self) -> u64 {
        HEADER_SIZE as u64 + self.size as u64 + (self.size % 2) as u64
    }
}

/// Read a chunk header from `source`.
pub fn parse_header<S: Source + ?Sized>(source: &mut S) -> Result<ChunkHeader> {
    ChunkHeader::parse(source)
}
