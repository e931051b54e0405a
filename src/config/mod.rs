mod types;

pub use types::*;

use anyhow::{Context, Result};
use riffkit_io::FourCC;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;
    tracing::debug!("Loaded config from {:?}", path);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./riffkit.toml", "~/.config/riffkit/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

impl InspectConfig {
    /// Configured container tags, parsed.
    pub fn container_tags(&self) -> Result<Vec<FourCC>> {
        self.containers
            .iter()
            .map(|tag| {
                tag.parse::<FourCC>()
                    .with_context(|| format!("Invalid container tag {:?}", tag))
            })
            .collect()
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.read.buffer_size == 0 {
        anyhow::bail!("read.buffer_size cannot be 0");
    }

    if config.inspect.max_depth == 0 {
        anyhow::bail!("inspect.max_depth cannot be 0");
    }

    config.inspect.container_tags()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use riffkit_io::ReadMode;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.read.buffer_size, riffkit_io::DEFAULT_BUFFER_SIZE);
        assert_eq!(config.read.mode, ReadMode::Streamed);
        assert_eq!(config.inspect.max_depth, 16);
        assert_eq!(
            config.inspect.container_tags().unwrap(),
            vec![FourCC::RIFF, FourCC::LIST]
        );
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
[read]
buffer_size = 4096
mode = "buffered"

[inspect]
max_depth = 2
containers = ["RIFF", "LIST", "Xtra"]
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.read.buffer_size, 4096);
        assert_eq!(config.read.mode, ReadMode::Buffered);
        assert_eq!(config.inspect.max_depth, 2);
        assert_eq!(config.inspect.containers.len(), 3);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let file = write_config("[inspect]\nmax_depth = 3\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.read.buffer_size, riffkit_io::DEFAULT_BUFFER_SIZE);
        assert_eq!(config.inspect.containers, vec!["RIFF", "LIST"]);
    }

    #[test]
    fn test_rejects_zero_buffer() {
        let file = write_config("[read]\nbuffer_size = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("buffer_size"));
    }

    #[test]
    fn test_rejects_bad_container_tag() {
        let file = write_config("[inspect]\ncontainers = [\"TOOLONG\"]\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("TOOLONG"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/riffkit.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_custom_path_wins() {
        let file = write_config("[inspect]\nmax_depth = 5\n");
        let config = load_config_or_default(Some(file.path())).unwrap();
        assert_eq!(config.inspect.max_depth, 5);
    }
}
