use crate::{config::Config, flows};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

#[derive(Parser)]
#[command(version, about = "Resolve coordinates to addresses and cache the results")]
struct Cli {
    /// Configuration file (default: geocache.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the addresses of all coordinates in a CSV file
    Resolve(ResolveArgs),
    /// Show statistics about the address cache
    Stats {
        #[arg(long, value_name = "JSON")]
        cache: Option<PathBuf>,
    },
    /// Print the cached address of a single coordinate
    #[command(allow_negative_numbers = true)]
    Lookup {
        lat: f64,
        lon: f64,
        #[arg(long, value_name = "JSON")]
        cache: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct ResolveArgs {
    /// CSV file with one coordinate per row
    #[arg(short, long, value_name = "CSV")]
    pub input: PathBuf,

    /// Address cache (JSON)
    #[arg(long, value_name = "JSON")]
    pub cache: Option<PathBuf>,

    /// Minimum delay between two requests, e.g. "1s" or "1500ms"
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub min_delay: Option<Duration>,

    /// Persist the cache after this many new addresses
    #[arg(long, value_name = "N")]
    pub flush_every: Option<NonZeroUsize>,

    /// Query coordinates again that have been cached as unresolved
    #[arg(long)]
    pub retry_unresolved: bool,

    #[arg(long, value_name = "NAME")]
    pub lat_column: Option<String>,

    #[arg(long, value_name = "NAME")]
    pub lon_column: Option<String>,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    duration_str::parse(s).map_err(|err| err.to_string())
}

pub async fn run() -> Result<()> {
    let Cli { config, command } = Cli::parse();
    let cfg = Config::try_load_from_file_or_default(config.as_ref())?;
    match command {
        Command::Resolve(args) => flows::resolve(cfg, args).await,
        Command::Stats { cache } => flows::stats(cache.unwrap_or(cfg.cache.file)),
        Command::Lookup { lat, lon, cache } => {
            flows::lookup(cache.unwrap_or(cfg.cache.file), lat, lon)
        }
    }
}
