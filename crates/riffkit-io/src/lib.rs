//! Riffkit-IO: chunk-level RIFF reading and writing
//!
//! RIFF files are a sequence of tagged, length-prefixed chunks. Every chunk
//! is an 8-byte header (ASCII tag, little-endian `u32` size) followed by the
//! payload and, when the size is odd, one pad byte. `RIFF` and `LIST` chunks
//! open with a format tag and nest further chunks in their payload.
//!
//! # Modules
//!
//! - `source` - the [`Source`] capability and its seekable/forward adapters
//! - `header` - [`FourCC`] tags and [`ChunkHeader`] parsing
//! - `view` - bounded read-only windows (materialized and projected)
//! - `payload` - [`ChunkPayload`], the size-bounded cursor over chunk data
//! - `chunk` - [`Chunk`] lifecycles: buffered, streamed, projected, write
//! - `container` - `RIFF`/`LIST` traversal and assembly
//! - `stream` - [`Stream`], a shared handle for projected reading
//!
//! # Example
//!
//! ```
//! use riffkit_io::{Chunk, Container, ReadMode};
//! use std::io::Cursor;
//!
//! let data = b"RIFF\x10\x00\x00\x00WAVEdata\x04\x00\x00\x00abcd";
//! let mut src = Cursor::new(&data[..]);
//! let mut riff = Container::open(Chunk::read_streamed(&mut src)?)?;
//! assert_eq!(riff.format(), "WAVE");
//!
//! while let Some(mut chunk) = riff.next_chunk(ReadMode::Streamed)? {
//!     assert_eq!(chunk.tag(), "data");
//!     assert_eq!(&chunk.read_remaining()?[..], b"abcd");
//! }
//! # Ok::<(), riffkit_io::Error>(())
//! ```

pub mod chunk;
pub mod container;
pub mod error;
pub mod header;
pub mod options;
pub mod payload;
pub mod source;
pub mod stream;
pub mod view;

pub use chunk::{open_chunk, open_chunk_with, Backing, Chunk, PadState};
pub use container::{container_size, write_container, Container, RiffChunk, FORMAT_SIZE};
pub use error::{Error, Result};
pub use header::{parse_header, ChunkHeader, FourCC, HEADER_SIZE};
pub use options::{ReadMode, ReadOptions, DEFAULT_BUFFER_SIZE};
pub use payload::ChunkPayload;
pub use source::{Forward, Seekable, Source};
pub use stream::Stream;
pub use view::{MaterializedView, ProjectedView};
