//! Chunk tree inspection: listing, validation and payload extraction.

use crate::config::Config;
use anyhow::{Context, Result};
use riffkit_io::{Chunk, Container, FourCC, ReadOptions, Source, FORMAT_SIZE, HEADER_SIZE};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{SeekFrom, Write};

/// One chunk in an inspected file.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkNode {
    pub tag: String,
    /// Absolute offset of the chunk header
    pub offset: u64,
    pub size: u32,
    pub padded: bool,
    /// Format tag, for containers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChunkNode>,
}

impl ChunkNode {
    /// Offset of the first payload byte.
    pub fn payload_offset(&self) -> u64 {
        self.offset + HEADER_SIZE as u64
    }

    /// This node followed by all its descendants, depth first.
    pub fn flatten(&self) -> Vec<&ChunkNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }
}

/// Walks a RIFF file and builds its chunk tree.
#[derive(Debug, Clone)]
pub struct Inspector {
    containers: Vec<FourCC>,
    max_depth: usize,
    options: ReadOptions,
    verify: bool,
}

impl Inspector {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            containers: config.inspect.container_tags()?,
            max_depth: config.inspect.max_depth,
            options: config.read,
            verify: false,
        })
    }

    /// Read every payload byte instead of skipping, so truncation anywhere
    /// in the file is reported.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Scan the top-level chunks between the current position and `len`.
    pub fn scan<S: Source + ?Sized>(&self, source: &mut S, len: u64) -> Result<Vec<ChunkNode>> {
        let mut nodes = Vec::new();
        let mut offset = source.tell()?;

        while offset < len {
            let chunk = Chunk::read_streamed_with(&mut *source, &self.options)
                .with_context(|| format!("Failed to read chunk header at offset {}", offset))?;
            let total = chunk.total_encoded_size();
            nodes.push(self.walk(chunk.boxed(), offset, 1)?);
            offset += total;
        }

        Ok(nodes)
    }

    fn walk(
        &self,
        mut chunk: Chunk<Box<dyn Source + '_>>,
        offset: u64,
        depth: usize,
    ) -> Result<ChunkNode> {
        let tag = chunk.tag();
        let mut node = ChunkNode {
            tag: tag.to_string(),
            offset,
            size: chunk.size(),
            padded: chunk.is_padded(),
            format: None,
            children: Vec::new(),
        };

        let descend = self.containers.contains(&tag) && chunk.size() >= FORMAT_SIZE;
        if !descend || depth > self.max_depth {
            if descend {
                tracing::debug!("Not descending into {} at offset {}: depth limit", tag, offset);
            }
            let settled = if self.verify {
                chunk.discard()
            } else {
                chunk.skip()
            };
            settled.with_context(|| format!("Chunk {} at offset {} is truncated", tag, offset))?;
            return Ok(node);
        }

        let mut container = Container::open_any_with(chunk, &self.options)
            .with_context(|| format!("Failed to open container {} at offset {}", tag, offset))?;
        node.format = Some(container.format().to_string());

        let mut child_offset = node.payload_offset() + FORMAT_SIZE as u64;
        while let Some(child) = container
            .next_chunk(self.options.mode)
            .with_context(|| format!("Invalid subchunk of {} at offset {}", tag, child_offset))?
        {
            let total = child.total_encoded_size();
            node.children
                .push(self.walk(child.boxed(), child_offset, depth + 1)?);
            child_offset += total;
        }

        let settled = if self.verify {
            container.discard_rest()
        } else {
            container.skip_rest()
        };
        settled.with_context(|| format!("Container {} at offset {} is truncated", tag, offset))?;

        Ok(node)
    }
}

/// Find the `index`-th chunk (depth first) tagged `tag`.
pub fn find_chunk<'a>(nodes: &'a [ChunkNode], tag: FourCC, index: usize) -> Option<&'a ChunkNode> {
    nodes
        .iter()
        .flat_map(ChunkNode::flatten)
        .filter(|node| node.tag == tag.as_str())
        .nth(index)
}

/// Copy the payload of `node` from `source` to `sink`.
pub fn extract_payload<S: Source + ?Sized, W: Write + ?Sized>(
    source: &mut S,
    node: &ChunkNode,
    sink: &mut W,
) -> Result<u64> {
    source.seek_to(SeekFrom::Start(node.offset))?;
    let mut chunk = Chunk::read_streamed(&mut *source)?;
    let copied = chunk
        .payload_mut()
        .copy_to(sink)
        .with_context(|| format!("Failed to extract {} at offset {}", node.tag, node.offset))?;
    Ok(copied)
}

/// Render the chunk tree as indented text.
pub fn render_tree(nodes: &[ChunkNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(&mut out, node, 0);
    }
    out
}

fn render_node(out: &mut String, node: &ChunkNode, level: usize) {
    let _ = write!(
        out,
        "{:indent$}{} @{} size={}",
        "",
        node.tag,
        node.offset,
        node.size,
        indent = level * 2
    );
    if let Some(ref format) = node.format {
        let _ = write!(out, " format={}", format);
    }
    if node.padded {
        out.push_str(" padded");
    }
    out.push('\n');

    for child in &node.children {
        render_node(out, child, level + 1);
    }
}
