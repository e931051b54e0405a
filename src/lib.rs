//! Riffkit - inspect, validate, extract and rewrite RIFF files
//!
//! This library crate backs the `riffkit` binary and is exposed for
//! integration testing. Chunk-level I/O lives in `riffkit-io`.

pub mod config;
pub mod inspect;
pub mod rewrite;
