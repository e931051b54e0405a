//! Byte source capabilities.
//!
//! Chunk I/O works over anything implementing [`Source`]: a [`Read`] plus a
//! position query, with seeking and closing as optional capabilities. Forward
//! sources (pipes, sockets) and random-access sources (files, buffers) share
//! the same chunk API; operations that need a seek fall back to discard-reads
//! or fail with [`Error::NotSeekable`].

use crate::{Error, Result};
use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// A readable byte source with optional seek support.
pub trait Source: Read {
    /// Current position in the source.
    fn tell(&mut self) -> Result<u64>;

    /// Whether [`Source::seek_to`] is supported.
    fn is_seekable(&self) -> bool {
        false
    }

    /// Reposition the source.
    fn seek_to(&mut self, _pos: SeekFrom) -> Result<u64> {
        Err(Error::NotSeekable)
    }

    /// Whether the source has been closed.
    fn is_closed(&self) -> bool {
        false
    }
}

impl<S: Source + ?Sized> Source for &mut S {
    fn tell(&mut self) -> Result<u64> {
        (**self).tell()
    }

    fn is_seekable(&self) -> bool {
        (**self).is_seekable()
    }

    fn seek_to(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek_to(pos)
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn tell(&mut self) -> Result<u64> {
        (**self).tell()
    }

    fn is_seekable(&self) -> bool {
        (**self).is_seekable()
    }

    fn seek_to(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek_to(pos)
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

impl<T: AsRef<[u8]>> Source for Cursor<T> {
    fn tell(&mut self) -> Result<u64> {
        Ok(self.position())
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn seek_to(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.seek(pos)?)
    }
}

/// Random-access source over any `Read + Seek` (files, buffered readers).
#[derive(Debug)]
pub struct Seekable<R> {
    inner: R,
}

impl<R: Read + Seek> Seekable<R> {
    /// Wrap a seekable reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Get a reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Seekable<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Seek> Source for Seekable<R> {
    fn tell(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn seek_to(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }
}

/// Forward-only source over any `Read` (pipes, stdin, sockets).
///
/// The position is counted from the bytes handed out.
#[derive(Debug)]
pub struct Forward<R> {
    inner: R,
    position: u64,
}

impl<R: Read> Forward<R> {
    /// Wrap a reader, counting positions from zero.
    pub fn new(inner: R) -> Self {
        Self::with_position(inner, 0)
    }

    /// Wrap a reader that has already been advanced to `position`.
    pub fn with_position(inner: R, position: u64) -> Self {
        Self { inner, position }
    }

    /// Unwrap the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Forward<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Read> Source for Forward<R> {
    fn tell(&mut self) -> Result<u64> {
        Ok(self.position)
    }
}

/// Fill `buf` as far as the source allows.
///
/// Returns fewer than `buf.len()` bytes only when the source is exhausted.
pub(crate) fn read_full<S: Source + ?Sized>(source: &mut S, buf: &mut [u8]) -> Result<usize> {
    let (filled, res) = read_partial(source, buf);
    res.map(|()| filled)
}

/// Like [`read_full`], but also reports how many bytes landed in `buf`
/// before an error.
pub(crate) fn read_partial<S: Source + ?Sized>(
    source: &mut S,
    buf: &mut [u8],
) -> (usize, Result<()>) {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return (filled, Err(e.into())),
        }
    }
    (filled, Ok(()))
}

/// Fill `buf` completely or fail with [`Error::Truncated`].
pub(crate) fn read_exact<S: Source + ?Sized>(source: &mut S, buf: &mut [u8]) -> Result<()> {
    let got = read_full(source, buf)?;
    if got < buf.len() {
        return Err(Error::truncated((buf.len() - got) as u64, source.tell()?));
    }
    Ok(())
}

/// Read a fixed-size array or fail with [`Error::Truncated`].
pub(crate) fn read_array<const N: usize, S: Source + ?Sized>(source: &mut S) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    read_exact(source, &mut buf)?;
    Ok(buf)
}

/// Advance `n` bytes: by seeking when possible, else by discarding.
pub(crate) fn skip<S: Source + ?Sized>(source: &mut S, n: u64, scratch: &mut [u8]) -> Result<()> {
    if n == 0 {
        return Ok(());
    }
    if source.is_seekable() {
        seek_forward(source, n)
    } else {
        discard(source, n, scratch)
    }
}

/// Advance `n` bytes by seeking only.
pub(crate) fn seek_forward<S: Source + ?Sized>(source: &mut S, n: u64) -> Result<()> {
    let delta = i64::try_from(n)
        .map_err(|_| Error::size_overflow(format!("cannot seek forward {n} bytes")))?;
    source.seek_to(SeekFrom::Current(delta))?;
    Ok(())
}

/// Advance `n` bytes by reading into `scratch` and dropping the data.
pub(crate) fn discard<S: Source + ?Sized>(
    source: &mut S,
    n: u64,
    scratch: &mut [u8],
) -> Result<()> {
    debug_assert!(!scratch.is_empty());
    let mut left = n;
    while left > 0 {
        let step = left.min(scratch.len() as u64) as usize;
        let got = read_full(source, &mut scratch[..step])?;
        if got < step {
            return Err(Error::truncated(left - got as u64, source.tell()?));
        }
        left -= step as u64;
    }
    Ok(())
}
