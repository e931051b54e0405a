//! Re-encode a RIFF file chunk by chunk, optionally dropping subchunks.

use anyhow::{Context, Result};
use riffkit_io::{
    Chunk, ChunkHeader, Container, Error, FourCC, ReadMode, ReadOptions, Source, FORMAT_SIZE,
    HEADER_SIZE,
};
use serde::Serialize;
use std::io::{SeekFrom, Write};

/// What a rewrite did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteSummary {
    pub tag: String,
    pub format: String,
    /// Declared size of the rewritten container
    pub size: u32,
    pub kept: usize,
    pub dropped: usize,
}

impl RewriteSummary {
    /// Bytes written, header included.
    pub fn written(&self) -> u64 {
        HEADER_SIZE as u64 + self.size as u64 + (self.size % 2) as u64
    }
}

/// Copy the top-level container of `source` to `sink`, leaving out direct
/// subchunks tagged with any of `drop`.
///
/// Two passes: the first sizes the kept subchunks so the container header
/// can be written up front, the second streams them across. The source must
/// be seekable.
pub fn rewrite<S, W>(
    source: &mut S,
    sink: &mut W,
    drop: &[FourCC],
    options: &ReadOptions,
) -> Result<RewriteSummary>
where
    S: Source + ?Sized,
    W: Write + ?Sized,
{
    if !source.is_seekable() {
        anyhow::bail!("Rewrite needs a seekable input");
    }
    let start = source.tell()?;

    let summary = {
        let chunk = Chunk::read_streamed_with(&mut *source, options)?;
        let mut container =
            Container::open_with(chunk, options).context("Input is not a RIFF container")?;

        let mut size = FORMAT_SIZE;
        let mut kept = 0;
        let mut dropped = 0;
        while let Some(child) = container.next_chunk(ReadMode::Streamed)? {
            if drop.contains(&child.tag()) {
                tracing::debug!("Dropping {} ({} bytes)", child.tag(), child.size());
                dropped += 1;
                continue;
            }
            size = u32::try_from(child.total_encoded_size())
                .ok()
                .and_then(|total| size.checked_add(total))
                .ok_or_else(|| Error::size_overflow("rewritten container exceeds 4 GiB"))?;
            kept += 1;
        }

        RewriteSummary {
            tag: container.tag().to_string(),
            format: container.format().to_string(),
            size,
            kept,
            dropped,
        }
    };

    source.seek_to(SeekFrom::Start(start))?;
    let chunk = Chunk::read_streamed_with(&mut *source, options)?;
    let mut container = Container::open_with(chunk, options)?;

    ChunkHeader::new(container.tag(), summary.size).write_to(sink)?;
    sink.write_all(container.format().as_bytes())?;
    while let Some(mut child) = container.next_chunk(ReadMode::Streamed)? {
        if drop.contains(&child.tag()) {
            continue;
        }
        let tag = child.tag();
        child
            .write_to(sink)
            .with_context(|| format!("Failed to copy chunk {}", tag))?;
    }
    sink.flush()?;

    tracing::info!(
        "Rewrote {} ({}): kept {}, dropped {}",
        summary.tag,
        summary.format,
        summary.kept,
        summary.dropped
    );
    Ok(summary)
}
