//! Container chunks (`RIFF`, `LIST`): a format tag followed by subchunks.

use crate::chunk::{Backing, Chunk};
use crate::header::{ChunkHeader, FourCC, HEADER_SIZE};
use crate::options::{ReadMode, ReadOptions};
use crate::payload::ChunkPayload;
use crate::source::{read_array, Source};
use crate::view::MaterializedView;
use crate::{Error, Result};
use std::io::Write;

/// Size of the format tag opening a container's payload.
pub const FORMAT_SIZE: u32 = 4;

/// Walks the subchunks of a `RIFF` or `LIST` chunk.
///
/// Subchunks are handed out one at a time and borrow the container, so the
/// previous one is always gone before the next is parsed. Whatever the
/// caller left unread of it is skipped first.
///
/// A subchunk must fit in the parent together with its pad byte: an odd
/// child whose pad would fall outside the parent's payload is rejected with
/// [`Error::ChunkOverflowsParent`].
#[derive(Debug)]
pub struct Container<S> {
    chunk: Chunk<S>,
    format: FourCC,
    options: ReadOptions,
    // payload position where the last handed-out subchunk ends
    child_end: u64,
}

impl<S: Source> Container<S> {
    /// Open a `RIFF` or `LIST` chunk.
    pub fn open(chunk: Chunk<S>) -> Result<Self> {
        Self::open_with(chunk, &ReadOptions::default())
    }

    /// Open a container chunk, requiring the given tag.
    pub fn open_expecting(chunk: Chunk<S>, expected: FourCC) -> Result<Self> {
        if chunk.tag() != expected {
            return Err(Error::UnexpectedTag {
                found: chunk.tag(),
                expected,
            });
        }
        Self::open(chunk)
    }

    /// [`Container::open`] with explicit options for subchunks.
    pub fn open_with(chunk: Chunk<S>, options: &ReadOptions) -> Result<Self> {
        if !chunk.tag().is_container() {
            return Err(Error::UnexpectedTag {
                found: chunk.tag(),
                expected: FourCC::RIFF,
            });
        }
        Self::open_any_with(chunk, options)
    }

    /// Walk any chunk laid out like a `LIST`: format tag, then subchunks.
    pub fn open_any_with(mut chunk: Chunk<S>, options: &ReadOptions) -> Result<Self> {
        let payload = chunk.payload();
        if payload.position() != 0 {
            return Err(Error::AlreadyConsumed {
                position: payload.position(),
                size: payload.size(),
            });
        }
        if payload.size() < FORMAT_SIZE {
            return Err(Error::malformed(format!(
                "{} chunk of {} byte(s) cannot hold a format tag",
                chunk.tag(),
                chunk.size()
            )));
        }

        let format = FourCC::new(read_array::<4, ChunkPayload<S>>(chunk.payload_mut())?)?;
        tracing::debug!(tag = %chunk.tag(), %format, size = chunk.size(), "Opened container");

        Ok(Self {
            chunk,
            format,
            options: *options,
            child_end: FORMAT_SIZE as u64,
        })
    }

    /// Container tag (`RIFF` or `LIST`).
    pub fn tag(&self) -> FourCC {
        self.chunk.tag()
    }

    /// Format tag, e.g. `WAVE` or `INFO`.
    pub fn format(&self) -> FourCC {
        self.format
    }

    /// Declared payload size, format tag included.
    pub fn size(&self) -> u32 {
        self.chunk.size()
    }

    /// Payload bytes not yet consumed.
    pub fn remaining(&self) -> u32 {
        self.chunk.payload().remaining()
    }

    /// Whether every subchunk has been consumed.
    pub fn is_consumed(&self) -> bool {
        self.chunk.payload().is_consumed()
    }

    /// The underlying chunk.
    pub fn chunk(&self) -> &Chunk<S> {
        &self.chunk
    }

    /// Unwrap the underlying chunk.
    pub fn into_chunk(self) -> Chunk<S> {
        self.chunk
    }

    /// Skip leftovers of the previous subchunk and parse the next header.
    fn advance(&mut self) -> Result<Option<ChunkHeader>> {
        let tag = self.chunk.tag();
        let payload = self.chunk.payload_mut();

        let position = payload.position() as u64;
        if position < self.child_end {
            tracing::debug!(
                container = %tag,
                bytes = self.child_end - position,
                "Skipping unread subchunk remainder"
            );
            payload.skip(self.child_end - position)?;
        }
        if payload.is_consumed() {
            return Ok(None);
        }

        let remaining = payload.remaining();
        if remaining < HEADER_SIZE {
            payload.discard_remaining()?;
            return Err(Error::malformed(format!(
                "{remaining} trailing byte(s) in {tag} are too short for a chunk header"
            )));
        }

        let header = ChunkHeader::parse(payload)?;
        let needed = header.total_encoded_size() - HEADER_SIZE as u64;
        let remaining = payload.remaining() as u64;
        if needed > remaining {
            return Err(Error::ChunkOverflowsParent {
                tag: header.tag,
                needed,
                remaining,
            });
        }

        self.child_end = payload.position() as u64 + needed;
        Ok(Some(header))
    }

    /// Next subchunk, read in `mode`, or `None` once the payload is used up.
    ///
    /// Fails with [`Error::ChunkOverflowsParent`] when the subchunk's padded
    /// size exceeds what is left of the container.
    pub fn next_chunk(
        &mut self,
        mode: ReadMode,
    ) -> Result<Option<Chunk<Backing<'_, ChunkPayload<S>>>>> {
        let Some(header) = self.advance()? else {
            return Ok(None);
        };
        let options = self.options.mode(mode);
        Chunk::from_header(header, self.chunk.payload_mut(), &options).map(Some)
    }

    /// Next subchunk in the mode given at open time.
    pub fn next_default(&mut self) -> Result<Option<Chunk<Backing<'_, ChunkPayload<S>>>>> {
        let mode = self.options.mode;
        self.next_chunk(mode)
    }

    /// Next subchunk, copied into memory.
    pub fn next_buffered(&mut self) -> Result<Option<Chunk<MaterializedView>>> {
        let Some(header) = self.advance()? else {
            return Ok(None);
        };
        Chunk::<MaterializedView>::buffered_from_header(
            header,
            self.chunk.payload_mut(),
            &self.options,
        )
        .map(Some)
    }

    /// Skip all remaining subchunks and the container's own pad byte.
    pub fn skip_rest(&mut self) -> Result<()> {
        self.chunk.skip()
    }

    /// Like [`Container::skip_rest`], but reads the bytes so truncation is
    /// caught on seekable sources too.
    pub fn discard_rest(&mut self) -> Result<()> {
        self.chunk.discard()
    }
}

/// Encoded payload size of a container holding `children`.
pub fn container_size<S>(children: &[Chunk<S>]) -> Result<u32> {
    children
        .iter()
        .try_fold(FORMAT_SIZE, |acc, child| {
            u32::try_from(child.total_encoded_size())
                .ok()
                .and_then(|size| acc.checked_add(size))
        })
        .ok_or_else(|| {
            Error::size_overflow(format!(
                "{} subchunks exceed the 32-bit container size",
                children.len()
            ))
        })
}

/// Write a container chunk (`RIFF`/`LIST`) with the given subchunks.
///
/// The declared size is computed from the children before anything is
/// written. Returns the number of bytes written.
pub fn write_container<W: Write + ?Sized, S: Source>(
    sink: &mut W,
    tag: FourCC,
    format: FourCC,
    children: &mut [Chunk<S>],
) -> Result<u64> {
    let size = container_size(children)?;
    ChunkHeader::new(tag, size).write_to(sink)?;
    sink.write_all(format.as_bytes())?;

    let mut written = (HEADER_SIZE + FORMAT_SIZE) as u64;
    for child in children.iter_mut() {
        written += child.write_to(sink)?;
    }
    tracing::debug!(%tag, %format, size, children = children.len(), "Wrote container");
    Ok(written)
}

/// A fully buffered top-level `RIFF` chunk.
#[derive(Debug)]
pub struct RiffChunk {
    header: ChunkHeader,
    format: FourCC,
    subchunks: Vec<Chunk<MaterializedView>>,
}

impl RiffChunk {
    /// Tag every RIFF file starts with.
    pub const ID: FourCC = FourCC::RIFF;

    /// Read a whole `RIFF` chunk and its direct subchunks into memory.
    pub fn from_stream<S: Source + ?Sized>(source: &mut S) -> Result<Self> {
        let chunk = Chunk::read_buffered(source)?;
        let header = *chunk.header();
        let mut container = Container::open_expecting(chunk, Self::ID)?;

        let mut subchunks = Vec::new();
        while let Some(sub) = container.next_buffered()? {
            subchunks.push(sub);
        }

        Ok(Self {
            header,
            format: container.format(),
            subchunks,
        })
    }

    /// Always `RIFF`.
    pub fn id(&self) -> FourCC {
        self.header.tag
    }

    /// Declared payload size.
    pub fn size(&self) -> u32 {
        self.header.size
    }

    /// Format tag.
    pub fn format(&self) -> FourCC {
        self.format
    }

    /// Subchunk at `index`.
    pub fn subchunk(&self, index: usize) -> Option<&Chunk<MaterializedView>> {
        self.subchunks.get(index)
    }

    /// All subchunks in file order.
    pub fn subchunks(&self) -> &[Chunk<MaterializedView>] {
        &self.subchunks
    }

    /// First subchunk with the given tag.
    pub fn find(&self, tag: FourCC) -> Option<&Chunk<MaterializedView>> {
        self.subchunks.iter().find(|c| c.tag() == tag)
    }
}
