mod cli;

use riffkit::{config, inspect, rewrite};
use riffkit_io::{FourCC, Seekable};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "riffkit=trace,riffkit_io=trace".to_string()
        } else {
            "riffkit=info,riffkit_io=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { file, json } => info(&file, &config, json),
        Commands::Validate { file } => validate(&file, &config),
        Commands::Extract {
            file,
            tag,
            index,
            output,
        } => extract(&file, &tag, index, output.as_deref(), &config),
        Commands::Rewrite {
            input,
            output,
            drop,
        } => rewrite_file(&input, &output, &drop, &config),
        Commands::Version => {
            println!("riffkit {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Open `path` for chunk reading, returning the source and the file length.
fn open_source(path: &Path) -> Result<(Seekable<BufReader<File>>, u64)> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {:?}", path);
    }
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let len = file.metadata()?.len();
    Ok((Seekable::new(BufReader::new(file)), len))
}

fn parse_tag(tag: &str) -> Result<FourCC> {
    tag.parse::<FourCC>()
        .with_context(|| format!("Invalid chunk tag {:?}: expected 4 ASCII characters", tag))
}

fn info(file: &Path, config: &config::Config, json: bool) -> Result<()> {
    let (mut source, len) = open_source(file)?;
    let nodes = inspect::Inspector::new(config)?.scan(&mut source, len)?;

    if json {
        let json_str = serde_json::to_string_pretty(&nodes)?;
        println!("{}", json_str);
    } else {
        println!("File: {}", file.display());
        println!("Size: {} bytes", len);
        println!();
        print!("{}", inspect::render_tree(&nodes));
    }

    Ok(())
}

fn validate(file: &Path, config: &config::Config) -> Result<()> {
    let (mut source, len) = open_source(file)?;
    tracing::info!("Validating {:?}", file);

    let nodes = inspect::Inspector::new(config)?
        .verify(true)
        .scan(&mut source, len)
        .with_context(|| format!("{} is not a valid RIFF file", file.display()))?;

    let count: usize = nodes.iter().map(|n| n.flatten().len()).sum();
    println!("✓ {} is valid ({} chunks)", file.display(), count);

    Ok(())
}

fn extract(
    file: &Path,
    tag: &str,
    index: usize,
    output: Option<&Path>,
    config: &config::Config,
) -> Result<()> {
    let tag = parse_tag(tag)?;
    let (mut source, len) = open_source(file)?;
    let nodes = inspect::Inspector::new(config)?.scan(&mut source, len)?;

    let node = inspect::find_chunk(&nodes, tag, index).with_context(|| {
        format!(
            "No chunk {:?} at index {} in {}",
            tag.as_str(),
            index,
            file.display()
        )
    })?;

    let copied = match output {
        Some(path) => {
            let out =
                File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
            let mut out = BufWriter::new(out);
            let copied = inspect::extract_payload(&mut source, node, &mut out)?;
            out.flush()?;
            copied
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            let copied = inspect::extract_payload(&mut source, node, &mut out)?;
            out.flush()?;
            copied
        }
    };
    tracing::info!("Extracted {} bytes of {} at offset {}", copied, node.tag, node.offset);

    Ok(())
}

fn rewrite_file(
    input: &Path,
    output: &Path,
    drop: &[String],
    config: &config::Config,
) -> Result<()> {
    let drop = drop
        .iter()
        .map(|tag| parse_tag(tag))
        .collect::<Result<Vec<_>>>()?;

    let (mut source, _) = open_source(input)?;
    let out = File::create(output).with_context(|| format!("Failed to create {:?}", output))?;
    let mut out = BufWriter::new(out);

    let summary = rewrite::rewrite(&mut source, &mut out, &drop, &config.read)
        .with_context(|| format!("Failed to rewrite {}", input.display()))?;

    println!(
        "Wrote {} ({} bytes): kept {} chunk(s), dropped {}",
        output.display(),
        summary.written(),
        summary.kept,
        summary.dropped
    );

    Ok(())
}
