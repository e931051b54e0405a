//! Shared stream handle.
//!
//! [`Stream`] wraps a [`Source`] behind a reference-counted handle so that
//! several readers (the caller and any [`ProjectedView`]s carved out of it)
//! can take turns on the same cursor. It also adds exact-read helpers for
//! the primitive RIFF fields.
//!
//! [`ProjectedView`]: crate::ProjectedView

use crate::header::FourCC;
use crate::source::{read_array, read_exact, Forward, Source};
use crate::{Error, Result};
use bytes::Bytes;
use std::cell::RefCell;
use std::io::{self, Cursor, Read, SeekFrom};
use std::rc::Rc;

struct Shared<S> {
    source: S,
    closed: bool,
}

/// Cloneable handle to a shared byte source.
///
/// Clones refer to the same source and cursor. The handle is deliberately
/// `!Send`: one consumer advances the source at a time.
pub struct Stream<S> {
    shared: Rc<RefCell<Shared<S>>>,
}

impl<S> Clone for Stream<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<S> std::fmt::Debug for Stream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("closed", &self.is_closed())
            .field("handles", &Rc::strong_count(&self.shared))
            .finish()
    }
}

impl Stream<Cursor<Bytes>> {
    /// Create a seekable stream over in-memory bytes.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::new(Cursor::new(data.into()))
    }
}

impl<R: Read> Stream<Forward<R>> {
    /// Create a forward-only stream over a reader.
    pub fn from_reader(reader: R) -> Self {
        Self::new(Forward::new(reader))
    }
}

impl<S> Stream<S> {
    /// Close the stream. Every handle and projected view sees the change.
    pub fn close(&self) {
        self.shared.borrow_mut().closed = true;
    }

    /// Whether the stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.borrow().closed
    }

    /// Whether two handles share the same source.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<S: Source> Stream<S> {
    /// Wrap a source.
    pub fn new(source: S) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                source,
                closed: false,
            })),
        }
    }

    /// Run `f` against the source, failing if the stream is closed.
    pub(crate) fn with_source<T>(&self, f: impl FnOnce(&mut S) -> Result<T>) -> Result<T> {
        let mut shared = self.shared.borrow_mut();
        if shared.closed || shared.source.is_closed() {
            return Err(Error::Closed);
        }
        f(&mut shared.source)
    }

    /// Current position of the shared cursor.
    pub fn tell(&self) -> Result<u64> {
        self.with_source(|src| src.tell())
    }

    /// Reposition the shared cursor.
    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        self.with_source(|src| src.seek_to(pos))
    }

    /// Read exactly `n` bytes.
    pub fn read_bytes(&self, n: usize) -> Result<Bytes> {
        self.with_source(|src| {
            let mut buf = vec![0u8; n];
            read_exact(src, &mut buf)?;
            Ok(Bytes::from(buf))
        })
    }

    /// Read a four-character code.
    pub fn read_fourcc(&self) -> Result<FourCC> {
        self.with_source(|src| FourCC::new(read_array::<4, S>(src)?))
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&self) -> Result<u32> {
        self.with_source(|src| Ok(u32::from_le_bytes(read_array::<4, S>(src)?)))
    }
}

impl<S: Source> Read for Stream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.with_source(|src| Ok(src.read(buf)?))?)
    }
}

impl<S: Source> Source for Stream<S> {
    fn tell(&mut self) -> Result<u64> {
        Stream::tell(self)
    }

    fn is_seekable(&self) -> bool {
        self.shared.borrow().source.is_seekable()
    }

    fn seek_to(&mut self, pos: SeekFrom) -> Result<u64> {
        Stream::seek(self, pos)
    }

    fn is_closed(&self) -> bool {
        let shared = self.shared.borrow();
        shared.closed || shared.source.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_from_bytes_reads() {
        let stream = Stream::from_bytes(&b"MOCK"[..]);
        assert_eq!(stream.read_bytes(4).unwrap(), Bytes::from_static(b"MOCK"));
    }

    #[test]
    fn test_tell_returns_source_position() {
        let mut cursor = Cursor::new(Bytes::from_static(b"MOCK"));
        cursor.set_position(3);
        let stream = Stream::new(cursor);
        assert_eq!(stream.tell().unwrap(), 3);
    }

    #[test]
    fn test_clones_share_cursor() {
        let a = Stream::from_bytes(&b"ABCDEFGH"[..]);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        a.read_bytes(3).unwrap();
        assert_eq!(b.tell().unwrap(), 3);
        assert_eq!(b.read_bytes(2).unwrap(), Bytes::from_static(b"DE"));
    }

    #[test]
    fn test_truncated_read() {
        let stream = Stream::from_bytes(&b"M"[..]);
        let err = stream.read_bytes(4).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected end of stream: expected 3 more byte(s) after position 1"
        );
    }

    #[test]
    fn test_read_fourcc() {
        let stream = Stream::from_bytes(&b"MOCK"[..]);
        assert_eq!(stream.read_fourcc().unwrap(), "MOCK");

        let stream = Stream::from_bytes(&b"MO"[..]);
        assert_matches!(
            stream.read_fourcc(),
            Err(Error::Truncated {
                missing: 2,
                position: 2
            })
        );
    }

    #[test]
    fn test_read_u32() {
        let stream = Stream::from_bytes(&b"\x04\x00\x00\x00"[..]);
        assert_eq!(stream.read_u32().unwrap(), 4);

        let stream = Stream::from_bytes(&b"\x04\x00\x00"[..]);
        assert_matches!(
            stream.read_u32(),
            Err(Error::Truncated {
                missing: 1,
                position: 3
            })
        );
    }

    #[test]
    fn test_closed_stream_rejects_reads() {
        let stream = Stream::from_bytes(&b"MOCK"[..]);
        let other = stream.clone();
        other.close();
        assert!(stream.is_closed());
        assert_matches!(stream.read_bytes(1), Err(Error::Closed));
        assert_matches!(stream.tell(), Err(Error::Closed));
    }

    #[test]
    fn test_forward_stream_is_not_seekable() {
        let stream = Stream::from_reader(&b"MOCK"[..]);
        assert!(!Source::is_seekable(&stream));
        assert_matches!(stream.seek(SeekFrom::Start(0)), Err(Error::NotSeekable));
    }
}
