//! Bounded, read-only windows over a byte source.
//!
//! A view has a fixed size and its own cursor. Seeks clamp to the window
//! instead of failing, reads stop at the window's end, and writes are always
//! rejected.
//!
//! - [`MaterializedView`] copies its bytes out of the source up front and is
//!   independent of it afterwards.
//! - [`ProjectedView`] only records where the window starts in a shared
//!   [`Stream`] and reads through it lazily.

use crate::source::{read_partial, Source};
use crate::stream::Stream;
use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Cap on the up-front allocation when materializing a declared size, so a
/// corrupt length fails on truncation instead of exhausting memory.
const MAX_PREALLOC: usize = 64 * 1024;

/// Size and cursor shared by both view kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    size: u32,
    cursor: u32,
}

impl Window {
    fn new(size: u32) -> Self {
        Self { size, cursor: 0 }
    }

    fn remaining(&self) -> u32 {
        self.size - self.cursor
    }

    fn clamp(&self, n: usize) -> usize {
        n.min(self.remaining() as usize)
    }

    fn advance(&mut self, n: usize) {
        // callers never pass more than `clamp` returned
        self.cursor += n as u32;
    }

    fn seek(&mut self, pos: SeekFrom) -> u64 {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.cursor as i128 + delta as i128,
            SeekFrom::End(delta) => self.size as i128 + delta as i128,
        };
        self.cursor = target.clamp(0, self.size as i128) as u32;
        self.cursor as u64
    }
}

fn read_only() -> io::Error {
    Error::Unsupported("view is read-only").into()
}

/// A window whose bytes were copied into memory at construction.
#[derive(Debug, Clone)]
pub struct MaterializedView {
    data: Bytes,
    window: Window,
    closed: bool,
}

impl MaterializedView {
    /// Copy exactly `size` bytes out of `source`.
    ///
    /// Fails with [`Error::Truncated`] if the source runs dry first.
    pub fn from_source<S: Source + ?Sized>(source: &mut S, size: u32) -> Result<Self> {
        let wanted = usize::try_from(size).map_err(|_| {
            Error::size_overflow(format!("{size} byte window exceeds addressable memory"))
        })?;

        let mut buf = Vec::with_capacity(wanted.min(MAX_PREALLOC));
        let got = (&mut *source).take(size as u64).read_to_end(&mut buf)?;
        if got < wanted {
            return Err(Error::truncated((wanted - got) as u64, source.tell()?));
        }

        Ok(Self {
            data: Bytes::from(buf),
            window: Window::new(size),
            closed: false,
        })
    }

    /// Wrap bytes that are already in memory.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let size = u32::try_from(data.len()).map_err(|_| {
            Error::size_overflow(format!("{} bytes exceed a 32-bit window", data.len()))
        })?;
        Ok(Self {
            data,
            window: Window::new(size),
            closed: false,
        })
    }

    /// The whole window, independent of the cursor.
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Window size.
    pub fn size(&self) -> u32 {
        self.window.size
    }

    /// Cursor within the window.
    pub fn position(&self) -> u32 {
        self.window.cursor
    }

    /// Bytes left before the end of the window.
    pub fn remaining(&self) -> u32 {
        self.window.remaining()
    }

    /// Close the view.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Whether the view has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// Read up to `n` bytes, clamped to the window.
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        self.check_open()?;
        let n = self.window.clamp(n);
        let start = self.window.cursor as usize;
        self.window.advance(n);
        Ok(self.data.slice(start..start + n))
    }
}

impl Read for MaterializedView {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = self.read_bytes(buf.len())?;
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}

impl Seek for MaterializedView {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check_open()?;
        Ok(self.window.seek(pos))
    }
}

impl Write for MaterializedView {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        self.check_open()?;
        Err(read_only())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.check_open()?)
    }
}

impl Source for MaterializedView {
    fn tell(&mut self) -> Result<u64> {
        self.check_open()?;
        Ok(self.window.cursor as u64)
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn seek_to(&mut self, pos: SeekFrom) -> Result<u64> {
        self.check_open()?;
        Ok(self.window.seek(pos))
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// A window that reads lazily through a shared [`Stream`].
///
/// Construction moves the stream's cursor past the window so the caller can
/// keep reading what follows. Each read seeks the stream into the window and
/// puts the cursor back afterwards.
#[derive(Debug, Clone)]
pub struct ProjectedView<S> {
    stream: Stream<S>,
    base: u64,
    window: Window,
    closed: bool,
}

impl<S: Source> ProjectedView<S> {
    /// Reserve the next `size` bytes of `stream`.
    pub fn project(stream: &Stream<S>, size: u32) -> Result<Self> {
        let base = stream.with_source(|src| {
            if !src.is_seekable() {
                return Err(Error::NotSeekable);
            }
            let base = src.tell()?;
            src.seek_to(SeekFrom::Current(size as i64))?;
            Ok(base)
        })?;
        tracing::trace!(base, size, "Projected view");

        Ok(Self {
            stream: stream.clone(),
            base,
            window: Window::new(size),
            closed: false,
        })
    }

    /// Offset of the window's first byte in the stream.
    pub fn base_offset(&self) -> u64 {
        self.base
    }

    /// Window size.
    pub fn size(&self) -> u32 {
        self.window.size
    }

    /// Cursor within the window.
    pub fn position(&self) -> u32 {
        self.window.cursor
    }

    /// Bytes left before the end of the window.
    pub fn remaining(&self) -> u32 {
        self.window.remaining()
    }

    /// Close this view. The stream stays open.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Whether this view or its stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed || self.stream.is_closed()
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// Read up to `n` bytes, clamped to the window.
    ///
    /// Fails with [`Error::Truncated`] when the stream ends inside the window;
    /// the reported position is absolute in the stream. The stream's cursor is
    /// back where it was afterwards, even when the read fails.
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        self.check_open()?;
        let wanted = self.window.clamp(n);
        if wanted == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = BytesMut::zeroed(wanted);
        let start = self.base + self.window.cursor as u64;
        let (got, res) = self.stream.with_source(|src| {
            let resume = src.tell()?;
            src.seek_to(SeekFrom::Start(start))?;
            let (got, res) = read_partial(src, &mut buf);
            src.seek_to(SeekFrom::Start(resume))?;
            Ok((got, res))
        })?;

        self.window.advance(got);
        res?;
        if got < wanted {
            return Err(Error::truncated(
                (wanted - got) as u64,
                self.base + self.window.cursor as u64,
            ));
        }
        buf.truncate(got);
        Ok(buf.freeze())
    }
}

impl<S: Source> Read for ProjectedView<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = self.read_bytes(buf.len())?;
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }
}

impl<S: Source> Seek for ProjectedView<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check_open()?;
        Ok(self.window.seek(pos))
    }
}

impl<S: Source> Write for ProjectedView<S> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        self.check_open()?;
        Err(read_only())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.check_open()?)
    }
}

impl<S: Source> Source for ProjectedView<S> {
    fn tell(&mut self) -> Result<u64> {
        self.check_open()?;
        Ok(self.window.cursor as u64)
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn seek_to(&mut self, pos: SeekFrom) -> Result<u64> {
        self.check_open()?;
        Ok(self.window.seek(pos))
    }

    fn is_closed(&self) -> bool {
        ProjectedView::is_closed(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Forward, Seekable};
    use assert_matches::assert_matches;
    use std::io::Cursor;

    #[test]
    fn test_materialized_copies_exact_window() {
        let mut src = Cursor::new(b"0123456789".to_vec());
        let mut view = MaterializedView::from_source(&mut src, 4).unwrap();
        assert_eq!(src.position(), 4);
        assert_eq!(view.size(), 4);
        assert_eq!(view.read_bytes(10).unwrap(), Bytes::from_static(b"0123"));
        assert_eq!(view.read_bytes(10).unwrap(), Bytes::new());
        assert_eq!(view.position(), 4);
    }

    #[test]
    fn test_materialized_truncated() {
        let mut src = Forward::new(&b"MOCKDAT"[..]);
        let err = MaterializedView::from_source(&mut src, 8).unwrap_err();
        assert_matches!(
            err,
            Error::Truncated {
                missing: 1,
                position: 7
            }
        );
    }

    #[test]
    fn test_materialized_independent_of_source() {
        let stream = Stream::from_bytes(&b"abcdef"[..]);
        let mut handle = stream.clone();
        let mut view = MaterializedView::from_source(&mut handle, 3).unwrap();
        stream.close();
        assert_eq!(view.read_bytes(3).unwrap(), Bytes::from_static(b"abc"));
    }

    #[test]
    fn test_seek_clamps() {
        let mut view = MaterializedView::from_bytes(&b"abcdef"[..]).unwrap();
        assert_eq!(view.seek(SeekFrom::Start(100)).unwrap(), 6);
        assert_eq!(view.seek(SeekFrom::Current(-100)).unwrap(), 0);
        assert_eq!(view.seek(SeekFrom::End(-2)).unwrap(), 4);
        assert_eq!(view.read_bytes(10).unwrap(), Bytes::from_static(b"ef"));
        assert_eq!(view.seek(SeekFrom::End(5)).unwrap(), 6);
    }

    #[test]
    fn test_writes_unsupported() {
        let mut view = MaterializedView::from_bytes(&b"abc"[..]).unwrap();
        let err = view.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert_matches!(Error::from(err), Error::Unsupported(_));
    }

    #[test]
    fn test_closed_checked_before_write() {
        let mut view = MaterializedView::from_bytes(&b"abc"[..]).unwrap();
        view.close();
        assert_matches!(Error::from(view.write(b"x").unwrap_err()), Error::Closed);
        assert_matches!(view.read_bytes(1), Err(Error::Closed));
        assert_matches!(Error::from(view.seek(SeekFrom::Start(0)).unwrap_err()), Error::Closed);
    }

    #[test]
    fn test_projected_advances_stream() {
        let stream = Stream::from_bytes(&b"HEADwindowTAIL"[..]);
        stream.read_bytes(4).unwrap();
        let mut view = ProjectedView::project(&stream, 6).unwrap();
        assert_eq!(view.base_offset(), 4);
        assert_eq!(stream.tell().unwrap(), 10);

        // caller continues past the window, the view still reads its bytes
        assert_eq!(stream.read_bytes(4).unwrap(), Bytes::from_static(b"TAIL"));
        assert_eq!(view.read_bytes(3).unwrap(), Bytes::from_static(b"win"));
        assert_eq!(view.read_bytes(10).unwrap(), Bytes::from_static(b"dow"));
        assert_eq!(stream.tell().unwrap(), 14);
    }

    #[test]
    fn test_projected_seek_within_window() {
        let stream = Stream::from_bytes(&b"..abcdef.."[..]);
        stream.seek(SeekFrom::Start(2)).unwrap();
        let mut view = ProjectedView::project(&stream, 6).unwrap();
        view.seek(SeekFrom::End(-2)).unwrap();
        assert_eq!(view.read_bytes(5).unwrap(), Bytes::from_static(b"ef"));
        view.seek(SeekFrom::Start(1)).unwrap();
        assert_eq!(view.read_bytes(2).unwrap(), Bytes::from_static(b"bc"));
    }

    #[test]
    fn test_projected_truncated() {
        let stream = Stream::from_bytes(&b"abc"[..]);
        let mut view = ProjectedView::project(&stream, 5).unwrap();
        let err = view.read_bytes(5).unwrap_err();
        assert_matches!(
            err,
            Error::Truncated {
                missing: 2,
                position: 3
            }
        );
    }

    #[test]
    fn test_projected_truncated_reports_stream_position() {
        let stream = Stream::from_bytes(&b"xxxxxxxxxxabc"[..]);
        stream.seek(SeekFrom::Start(10)).unwrap();
        let mut view = ProjectedView::project(&stream, 5).unwrap();
        let err = view.read_bytes(5).unwrap_err();
        assert_matches!(
            err,
            Error::Truncated {
                missing: 2,
                position: 13
            }
        );
        assert_eq!(view.position(), 3);
    }

    /// Fails every read that starts inside `bad`.
    struct FailingReader {
        inner: Cursor<&'static [u8]>,
        bad: std::ops::Range<u64>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let pos = self.inner.position();
            if self.bad.contains(&pos) {
                return Err(io::Error::other("disk error"));
            }
            let mut limit = buf.len();
            if pos < self.bad.start {
                limit = limit.min((self.bad.start - pos) as usize);
            }
            self.inner.read(&mut buf[..limit])
        }
    }

    impl Seek for FailingReader {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_projected_read_error_restores_stream() {
        let stream = Stream::new(Seekable::new(FailingReader {
            inner: Cursor::new(&b"HEADwindowTAIL"[..]),
            bad: 7..10,
        }));
        stream.read_bytes(4).unwrap();
        let mut view = ProjectedView::project(&stream, 6).unwrap();
        assert_eq!(stream.tell().unwrap(), 10);

        assert_matches!(view.read_bytes(6), Err(Error::Io(_)));
        assert_eq!(stream.tell().unwrap(), 10);
        // bytes read before the failure still count
        assert_eq!(view.position(), 3);

        // the stream carries on with whatever follows the window
        assert_eq!(stream.read_bytes(4).unwrap(), Bytes::from_static(b"TAIL"));
    }

    #[test]
    fn test_projected_writes_unsupported() {
        let stream = Stream::from_bytes(&b"abcdef"[..]);
        let mut view = ProjectedView::project(&stream, 3).unwrap();
        let err = view.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert_matches!(Error::from(err), Error::Unsupported(_));
        view.flush().unwrap();
        assert_eq!(view.read_bytes(3).unwrap(), Bytes::from_static(b"abc"));
    }

    #[test]
    fn test_projected_requires_seekable_stream() {
        let stream = Stream::from_reader(&b"abcdef"[..]);
        assert_matches!(ProjectedView::project(&stream, 3), Err(Error::NotSeekable));
    }

    #[test]
    fn test_projected_closed_with_stream() {
        let stream = Stream::from_bytes(&b"abcdef"[..]);
        let mut view = ProjectedView::project(&stream, 3).unwrap();
        stream.close();
        assert!(view.is_closed());
        assert_matches!(view.read_bytes(1), Err(Error::Closed));
        assert_matches!(Error::from(view.write(b"x").unwrap_err()), Error::Closed);
    }
}
