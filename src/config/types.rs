use riffkit_io::ReadOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// How chunks are read: scratch buffer size and payload mode
    #[serde(default)]
    pub read: ReadOptions,

    #[serde(default)]
    pub inspect: InspectConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InspectConfig {
    /// Maximum container nesting depth to descend into
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Chunk tags treated as containers (format tag followed by subchunks)
    #[serde(default = "default_containers")]
    pub containers: Vec<String>,
}

fn default_max_depth() -> usize {
    16
}

fn default_containers() -> Vec<String> {
    vec!["RIFF".to_string(), "LIST".to_string()]
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            containers: default_containers(),
        }
    }
}
