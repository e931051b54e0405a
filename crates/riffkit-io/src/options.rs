//! Read configuration shared by chunks and containers.

/// Default size of the scratch buffer used for discard-reads and copies.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// How a chunk's payload is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum ReadMode {
    /// Pull the whole payload into memory up front.
    Buffered,
    /// Leave the payload in the source and read it lazily.
    #[default]
    Streamed,
}

/// Options for reading chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct ReadOptions {
    /// Scratch buffer size for skips on forward-only sources and copy-out.
    pub buffer_size: usize,
    /// Payload consumption strategy for subchunks.
    pub mode: ReadMode,
}

impl ReadOptions {
    /// Set the scratch buffer size (at least one byte).
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Set the read mode.
    pub fn mode(mut self, mode: ReadMode) -> Self {
        self.mode = mode;
        self
    }

    pub(crate) fn scratch(&self) -> Vec<u8> {
        vec![0u8; self.buffer_size.max(1)]
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            mode: ReadMode::default(),
        }
    }
}
