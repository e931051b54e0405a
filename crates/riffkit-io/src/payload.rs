//! Size-bounded cursor over chunk data.

use crate::options::ReadOptions;
use crate::source::{self, Source};
use crate::{Error, Result};
use bytes::Bytes;
use std::io::{self, Read, SeekFrom, Write};

/// Cap on the up-front allocation for a single read.
const MAX_PREALLOC: usize = 64 * 1024;

/// The data of one chunk: `size` bytes read from `source`.
///
/// The position only moves forward and never passes `size`. Reads and skips
/// are clamped to what is left; only a source that runs dry inside the
/// window is an error.
#[derive(Debug)]
pub struct ChunkPayload<S> {
    source: S,
    size: u32,
    position: u32,
    scratch: Vec<u8>,
}

impl<S> ChunkPayload<S> {
    /// Declared payload size.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Bytes left to consume.
    pub fn remaining(&self) -> u32 {
        self.size - self.position
    }

    /// Whether every byte has been read or skipped.
    pub fn is_consumed(&self) -> bool {
        self.position == self.size
    }

    /// Get a reference to the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Unwrap the underlying source.
    pub fn into_inner(self) -> S {
        self.source
    }

    pub(crate) fn map_source<T>(self, f: impl FnOnce(S) -> T) -> ChunkPayload<T> {
        ChunkPayload {
            source: f(self.source),
            size: self.size,
            position: self.position,
            scratch: self.scratch,
        }
    }
}

impl<S: Source> ChunkPayload<S> {
    /// Bound `source` to `size` bytes with default options.
    pub fn new(source: S, size: u32) -> Self {
        Self::with_options(source, size, &ReadOptions::default())
    }

    /// Bound `source` to `size` bytes.
    pub fn with_options(source: S, size: u32, options: &ReadOptions) -> Self {
        Self {
            source,
            size,
            position: 0,
            scratch: options.scratch(),
        }
    }

    /// Read up to `n` bytes, clamped to what is left.
    ///
    /// Returns an empty buffer without touching the source once consumed.
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        let wanted = n.min(self.remaining() as usize);
        if wanted == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = Vec::with_capacity(wanted.min(MAX_PREALLOC));
        let res = (&mut self.source)
            .take(wanted as u64)
            .read_to_end(&mut buf);
        // bytes obtained before a failure still count
        self.position += buf.len() as u32;
        res?;

        if buf.len() < wanted {
            return Err(Error::truncated(
                (wanted - buf.len()) as u64,
                self.source.tell()?,
            ));
        }
        Ok(Bytes::from(buf))
    }

    /// Read everything that is left.
    pub fn read_remaining(&mut self) -> Result<Bytes> {
        self.read_bytes(self.remaining() as usize)
    }

    /// Skip up to `n` bytes: seek when the source allows, else discard.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let n = n.min(self.remaining() as u64);
        if n == 0 {
            return Ok(());
        }
        if self.source.is_seekable() {
            source::seek_forward(&mut self.source, n)?;
            self.position += n as u32;
            Ok(())
        } else {
            self.discard(n)
        }
    }

    /// Skip everything that is left. A no-op once consumed.
    pub fn skip_remaining(&mut self) -> Result<()> {
        self.skip(self.remaining() as u64)
    }

    /// Skip up to `n` bytes by seeking only.
    ///
    /// Fails with [`Error::NotSeekable`] on forward-only sources.
    pub fn skip_by_seek(&mut self, n: u64) -> Result<()> {
        let n = n.min(self.remaining() as u64);
        if n == 0 {
            return Ok(());
        }
        if !self.source.is_seekable() {
            return Err(Error::NotSeekable);
        }
        source::seek_forward(&mut self.source, n)?;
        self.position += n as u32;
        Ok(())
    }

    /// Skip up to `n` bytes by reading and dropping them.
    ///
    /// Unlike [`ChunkPayload::skip`] this detects truncation on seekable
    /// sources too.
    pub fn discard(&mut self, n: u64) -> Result<()> {
        let mut left = n.min(self.remaining() as u64);
        while left > 0 {
            let step = left.min(self.scratch.len() as u64) as usize;
            let got = self.pull(step)?;
            if got < step {
                return Err(Error::truncated(left - got as u64, self.source.tell()?));
            }
            left -= step as u64;
        }
        Ok(())
    }

    /// Discard everything that is left.
    pub fn discard_remaining(&mut self) -> Result<()> {
        self.discard(self.remaining() as u64)
    }

    /// Copy the whole payload to `sink` in scratch-buffer sized pieces.
    ///
    /// Only valid on an untouched payload.
    pub fn copy_to<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<u64> {
        if self.position != 0 {
            return Err(Error::AlreadyConsumed {
                position: self.position,
                size: self.size,
            });
        }

        let mut copied = 0u64;
        while !self.is_consumed() {
            let step = (self.remaining() as usize).min(self.scratch.len());
            let got = self.pull(step)?;
            sink.write_all(&self.scratch[..got])?;
            copied += got as u64;
            if got < step {
                return Err(Error::truncated((step - got) as u64, self.source.tell()?));
            }
        }
        Ok(copied)
    }

    /// Fill `scratch[..len]`, counting every byte obtained.
    fn pull(&mut self, len: usize) -> Result<usize> {
        let mut filled = 0;
        while filled < len {
            match self.source.read(&mut self.scratch[filled..len]) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    self.position += n as u32;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    /// Read the byte right after the payload (the pad byte).
    pub(crate) fn read_trailing_byte(&mut self) -> Result<u8> {
        let [byte] = source::read_array::<1, S>(&mut self.source)?;
        Ok(byte)
    }

    /// Skip `n` bytes right after the payload.
    pub(crate) fn skip_trailing(&mut self, n: u64) -> Result<()> {
        source::skip(&mut self.source, n, &mut self.scratch)
    }
}

impl<S: Source> Read for ChunkPayload<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let wanted = buf.len().min(self.remaining() as usize);
        if wanted == 0 {
            return Ok(0);
        }
        let n = self.source.read(&mut buf[..wanted])?;
        if n == 0 {
            // the window still has bytes, so this is the source running dry
            return Err(Error::truncated(wanted as u64, self.source.tell()?).into());
        }
        self.position += n as u32;
        Ok(n)
    }
}

/// Positions are reported in the underlying source's coordinates. Only
/// forward relative seeks are supported, clamped to the payload.
impl<S: Source> Source for ChunkPayload<S> {
    fn tell(&mut self) -> Result<u64> {
        self.source.tell()
    }

    fn is_seekable(&self) -> bool {
        self.source.is_seekable()
    }

    fn seek_to(&mut self, pos: SeekFrom) -> Result<u64> {
        match pos {
            SeekFrom::Current(delta) if delta >= 0 => {
                self.skip_by_seek(delta as u64)?;
                self.source.tell()
            }
            _ => Err(Error::NotSeekable),
        }
    }

    fn is_closed(&self) -> bool {
        self.source.is_closed()
    }
}
