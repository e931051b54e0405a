use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "riffkit")]
#[command(author, version, about = "Inspect and edit RIFF containers (WAV, AVI, WebP)")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the chunk tree of a file
    Info {
        /// File to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read every chunk and report structural or truncation errors
    Validate {
        /// File to validate
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Write the payload of a chunk to a file or stdout
    Extract {
        /// File to read
        #[arg(required = true)]
        file: PathBuf,

        /// Chunk tag, e.g. "data" or "fmt "
        #[arg(required = true)]
        tag: String,

        /// Which match to extract when the tag occurs more than once
        #[arg(long, default_value = "0")]
        index: usize,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-encode a file, optionally dropping top-level subchunks
    Rewrite {
        /// Input file
        #[arg(required = true)]
        input: PathBuf,

        /// Output file
        #[arg(required = true)]
        output: PathBuf,

        /// Subchunk tag to leave out (repeatable)
        #[arg(long = "drop", value_name = "TAG")]
        drop: Vec<String>,
    },

    /// Display version information
    Version,
}
