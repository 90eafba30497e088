#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use initfs_rs::{Config, Container, Projector, SurfaceCodec};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "initfs", version, about = "Unpack and repack InitFS archives")]
struct Cli {
    /// Settings file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (repeatable).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Unpack an archive into a directory with a repack manifest.
    Extract {
        /// Archive file (or an unpacked directory to copy).
        source: PathBuf,
        /// Output directory.
        output: PathBuf,
    },

    /// Repack an unpacked directory into an archive.
    Pack {
        /// Unpacked directory (or an archive to re-encode).
        source: PathBuf,
        /// Output archive file.
        output: PathBuf,
    },

    /// List file records.
    List {
        /// Archive file or unpacked directory.
        source: PathBuf,
        /// Print JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => Config::default(),
    };
    let projector = Projector::new(config);

    match cli.cmd {
        Command::Extract { source, output } => {
            let container = Container::load_with(&SurfaceCodec, &projector, &source)
                .with_context(|| format!("failed to load {}", source.display()))?;
            projector
                .extract(&container, &output)
                .with_context(|| format!("failed to extract into {}", output.display()))?;
        }
        Command::Pack { source, output } => {
            let container = Container::load_with(&SurfaceCodec, &projector, &source)
                .with_context(|| format!("failed to load {}", source.display()))?;
            container
                .save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
        Command::List { source, json } => {
            let container = Container::load_with(&SurfaceCodec, &projector, &source)
                .with_context(|| format!("failed to load {}", source.display()))?;
            if json {
                println!("{}", container.listing_json()?);
            } else {
                for s in &container.summaries()? {
                    match &s.fs {
                        Some(fs) => println!("{}  size={} fs={} sha256={}", s.path, s.size, fs, s.sha256),
                        None => println!("{}  size={} sha256={}", s.path, s.size, s.sha256),
                    }
                }
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
