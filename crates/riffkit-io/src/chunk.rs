//! RIFF chunks: header, payload and the pad byte that keeps chunks even.
//!
//! A chunk comes into existence in one of four ways:
//!
//! - [`Chunk::read_buffered`] pulls the payload (and pad) into memory at once.
//! - [`Chunk::read_streamed`] leaves the payload in the source; the pad byte
//!   stays pending until [`Chunk::read_pad`] or [`Chunk::skip_pad`].
//! - [`Chunk::read_projected`] carves the payload out of a shared [`Stream`]
//!   and moves the stream on to whatever follows the chunk.
//! - [`Chunk::create_for_write`] binds caller data for [`Chunk::write_to`].

use crate::header::{ChunkHeader, FourCC};
use crate::options::{ReadMode, ReadOptions};
use crate::payload::ChunkPayload;
use crate::source::{self, Source};
use crate::stream::Stream;
use crate::view::{MaterializedView, ProjectedView};
use crate::{Error, Result};
use bytes::Bytes;
use std::io::{self, Read, SeekFrom, Write};

/// State of the pad byte following an odd-sized payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadState {
    /// Even payload, no pad byte.
    NoPad,
    /// Pad byte not yet read or skipped.
    Pending,
    /// Pad byte settled.
    Consumed,
}

/// One RIFF chunk.
#[derive(Debug)]
pub struct Chunk<S> {
    header: ChunkHeader,
    payload: ChunkPayload<S>,
    pad: PadState,
    // false when the pad is synthesized for writing
    pad_in_source: bool,
}

impl<S> Chunk<S> {
    /// The chunk header.
    pub fn header(&self) -> &ChunkHeader {
        &self.header
    }

    /// Chunk tag.
    pub fn tag(&self) -> FourCC {
        self.header.tag
    }

    /// Declared payload size.
    pub fn size(&self) -> u32 {
        self.header.size
    }

    /// Whether a pad byte follows the payload.
    pub fn is_padded(&self) -> bool {
        self.header.is_padded()
    }

    /// Current pad byte state.
    pub fn pad_state(&self) -> PadState {
        self.pad
    }

    /// Header, payload and pad byte, regardless of how much was consumed.
    pub fn total_encoded_size(&self) -> u64 {
        self.header.total_encoded_size()
    }

    /// [`Chunk::total_encoded_size`] as a `usize`.
    pub fn encoded_len(&self) -> Result<usize> {
        let total = self.total_encoded_size();
        usize::try_from(total).map_err(|_| {
            Error::size_overflow(format!(
                "chunk {} encodes to {total} bytes, beyond addressable memory",
                self.header.tag
            ))
        })
    }

    /// Whether both payload and pad byte have been consumed.
    pub fn is_consumed(&self) -> bool {
        self.payload.is_consumed() && self.pad != PadState::Pending
    }

    /// The payload cursor.
    pub fn payload(&self) -> &ChunkPayload<S> {
        &self.payload
    }

    /// Mutable access to the payload cursor.
    pub fn payload_mut(&mut self) -> &mut ChunkPayload<S> {
        &mut self.payload
    }

    fn initial_pad(header: &ChunkHeader) -> PadState {
        if header.is_padded() {
            PadState::Pending
        } else {
            PadState::NoPad
        }
    }
}

impl Chunk<MaterializedView> {
    /// Read a chunk and its payload into memory.
    pub fn read_buffered<S: Source + ?Sized>(source: &mut S) -> Result<Self> {
        Self::read_buffered_with(source, &ReadOptions::default())
    }

    /// [`Chunk::read_buffered`] with explicit options.
    pub fn read_buffered_with<S: Source + ?Sized>(
        source: &mut S,
        options: &ReadOptions,
    ) -> Result<Self> {
        let header = ChunkHeader::parse(source)?;
        Self::buffered_from_header(header, source, options)
    }

    pub(crate) fn buffered_from_header<S: Source + ?Sized>(
        header: ChunkHeader,
        source: &mut S,
        options: &ReadOptions,
    ) -> Result<Self> {
        let view = MaterializedView::from_source(source, header.size)?;
        let pad = if header.is_padded() {
            let [byte] = source::read_array::<1, S>(source)?;
            if byte != 0 {
                tracing::warn!(tag = %header.tag, byte, "Non-zero pad byte");
            }
            PadState::Consumed
        } else {
            PadState::NoPad
        };
        tracing::trace!(tag = %header.tag, size = header.size, "Buffered chunk");

        Ok(Self {
            header,
            payload: ChunkPayload::with_options(view, header.size, options),
            pad,
            pad_in_source: false,
        })
    }

    /// The whole payload, independent of how much has been read.
    pub fn data(&self) -> Bytes {
        self.payload.get_ref().bytes()
    }
}

impl<S: Source> Chunk<ProjectedView<S>> {
    /// Read a chunk header from `stream` and project its payload.
    ///
    /// The stream is left after the pad byte, ready for the next chunk; the
    /// payload can be read later through the projected view.
    pub fn read_projected(stream: &Stream<S>) -> Result<Self> {
        Self::read_projected_with(stream, &ReadOptions::default())
    }

    /// [`Chunk::read_projected`] with explicit options.
    pub fn read_projected_with(stream: &Stream<S>, options: &ReadOptions) -> Result<Self> {
        let header = ChunkHeader::parse(&mut stream.clone())?;
        let view = ProjectedView::project(stream, header.size)?;
        let pad = if header.is_padded() {
            stream.seek(SeekFrom::Current(1))?;
            PadState::Consumed
        } else {
            PadState::NoPad
        };
        tracing::trace!(
            tag = %header.tag,
            size = header.size,
            base = view.base_offset(),
            "Projected chunk"
        );

        Ok(Self {
            header,
            payload: ChunkPayload::with_options(view, header.size, options),
            pad,
            pad_in_source: false,
        })
    }
}

impl<S: Source> Chunk<S> {
    /// Read a chunk header and leave the payload in `source`.
    pub fn read_streamed(source: S) -> Result<Self> {
        Self::read_streamed_with(source, &ReadOptions::default())
    }

    /// [`Chunk::read_streamed`] with explicit options.
    pub fn read_streamed_with(mut source: S, options: &ReadOptions) -> Result<Self> {
        let header = ChunkHeader::parse(&mut source)?;
        Ok(Self::streamed_from_header(header, source, options))
    }

    pub(crate) fn streamed_from_header(
        header: ChunkHeader,
        source: S,
        options: &ReadOptions,
    ) -> Self {
        tracing::trace!(tag = %header.tag, size = header.size, "Streamed chunk");
        Self {
            header,
            payload: ChunkPayload::with_options(source, header.size, options),
            pad: Self::initial_pad(&header),
            pad_in_source: true,
        }
    }

    /// Bind `size` bytes of `source` as the payload of a chunk to write.
    pub fn create_for_write(tag: FourCC, size: u32, source: S) -> Self {
        Self::create_for_write_with(tag, size, source, &ReadOptions::default())
    }

    /// [`Chunk::create_for_write`] with explicit options.
    pub fn create_for_write_with(
        tag: FourCC,
        size: u32,
        source: S,
        options: &ReadOptions,
    ) -> Self {
        let header = ChunkHeader::new(tag, size);
        Self {
            header,
            payload: ChunkPayload::with_options(source, size, options),
            pad: Self::initial_pad(&header),
            pad_in_source: false,
        }
    }

    /// Read up to `n` payload bytes.
    pub fn read(&mut self, n: usize) -> Result<Bytes> {
        self.payload.read_bytes(n)
    }

    /// Read the rest of the payload.
    pub fn read_remaining(&mut self) -> Result<Bytes> {
        self.payload.read_remaining()
    }

    /// Skip the rest of the payload, leaving the pad byte alone.
    pub fn skip_remaining(&mut self) -> Result<()> {
        self.payload.skip_remaining()
    }

    /// Skip the rest of the payload and the pad byte.
    pub fn skip(&mut self) -> Result<()> {
        self.payload.skip_remaining()?;
        self.skip_pad()
    }

    /// Read the rest of the payload and the pad byte, dropping the data.
    ///
    /// Slower than [`Chunk::skip`] on seekable sources but detects
    /// truncation.
    pub fn discard(&mut self) -> Result<()> {
        self.payload.discard_remaining()?;
        self.read_pad()?;
        Ok(())
    }

    fn check_payload_consumed(&self) -> Result<()> {
        if self.payload.is_consumed() {
            Ok(())
        } else {
            Err(Error::PayloadNotConsumed {
                remaining: self.payload.remaining(),
            })
        }
    }

    /// Settle the pad byte by reading it.
    ///
    /// Returns the pad byte the first time it is settled here, `None` when
    /// there is none or it was already settled.
    pub fn read_pad(&mut self) -> Result<Option<u8>> {
        self.check_payload_consumed()?;
        if self.pad != PadState::Pending {
            return Ok(None);
        }
        let byte = if self.pad_in_source {
            self.payload.read_trailing_byte()?
        } else {
            0
        };
        self.pad = PadState::Consumed;
        Ok(Some(byte))
    }

    /// Settle the pad byte by skipping it.
    pub fn skip_pad(&mut self) -> Result<()> {
        self.check_payload_consumed()?;
        if self.pad != PadState::Pending {
            return Ok(());
        }
        if self.pad_in_source {
            self.payload.skip_trailing(1)?;
        }
        self.pad = PadState::Consumed;
        Ok(())
    }

    /// Write header, payload and a zero pad byte (when padded) to `sink`.
    ///
    /// The payload must be untouched. Returns the number of bytes written.
    pub fn write_to<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64> {
        if self.payload.position() != 0 {
            return Err(Error::AlreadyConsumed {
                position: self.payload.position(),
                size: self.payload.size(),
            });
        }

        self.header.write_to(sink)?;
        let mut written = 8 + self.payload.copy_to(sink)?;
        if self.is_padded() {
            self.read_pad()?;
            sink.write_all(&[0])?;
            written += 1;
        }
        tracing::trace!(tag = %self.header.tag, written, "Wrote chunk");
        Ok(written)
    }

    /// Erase the source type, e.g. to recurse into nested containers.
    pub fn boxed<'a>(self) -> Chunk<Box<dyn Source + 'a>>
    where
        S: 'a,
    {
        Chunk {
            header: self.header,
            payload: self
                .payload
                .map_source(|s| Box::new(s) as Box<dyn Source + 'a>),
            pad: self.pad,
            pad_in_source: self.pad_in_source,
        }
    }
}

/// Where an opened chunk's payload lives.
#[derive(Debug)]
pub enum Backing<'a, S: ?Sized> {
    /// Copied into memory.
    Memory(MaterializedView),
    /// Still in the borrowed source.
    Stream(&'a mut S),
}

impl<S: Source + ?Sized> Read for Backing<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Memory(view) => view.read(buf),
            Self::Stream(src) => src.read(buf),
        }
    }
}

impl<S: Source + ?Sized> Source for Backing<'_, S> {
    fn tell(&mut self) -> Result<u64> {
        match self {
            Self::Memory(view) => view.tell(),
            Self::Stream(src) => src.tell(),
        }
    }

    fn is_seekable(&self) -> bool {
        match self {
            Self::Memory(_) => true,
            Self::Stream(src) => src.is_seekable(),
        }
    }

    fn seek_to(&mut self, pos: SeekFrom) -> Result<u64> {
        match self {
            Self::Memory(view) => view.seek_to(pos),
            Self::Stream(src) => src.seek_to(pos),
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Self::Memory(view) => view.is_closed(),
            Self::Stream(src) => src.is_closed(),
        }
    }
}

impl<'a, S: Source + ?Sized> Chunk<Backing<'a, S>> {
    pub(crate) fn from_header(
        header: ChunkHeader,
        source: &'a mut S,
        options: &ReadOptions,
    ) -> Result<Self> {
        match options.mode {
            ReadMode::Buffered => {
                let chunk =
                    Chunk::<MaterializedView>::buffered_from_header(header, source, options)?;
                Ok(Chunk {
                    header: chunk.header,
                    payload: chunk.payload.map_source(Backing::Memory),
                    pad: chunk.pad,
                    pad_in_source: chunk.pad_in_source,
                })
            }
            ReadMode::Streamed => Ok(Chunk::streamed_from_header(
                header,
                Backing::Stream(source),
                options,
            )),
        }
    }
}

/// Read the next chunk from `source` in the given mode.
pub fn open_chunk<S: Source + ?Sized>(
    source: &mut S,
    mode: ReadMode,
) -> Result<Chunk<Backing<'_, S>>> {
    open_chunk_with(source, &ReadOptions::default().mode(mode))
}

/// [`open_chunk`] taking the mode from `options`.
pub fn open_chunk_with<'a, S: Source + ?Sized>(
    source: &'a mut S,
    options: &ReadOptions,
) -> Result<Chunk<Backing<'a, S>>> {
    let header = ChunkHeader::parse(source)?;
    Chunk::from_header(header, source, options)
}
