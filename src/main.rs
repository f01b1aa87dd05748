//! fimscan - A rate-limited file integrity scanner.
//!
//! Usage:
//!   fimscan scan [PATHS]...     Scan paths and print one line per entry
//!   fimscan config [PATHS]...   Print the effective configuration
//!   fimscan --help              Show help

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fimscan_core::{Event, FileType, HashType, ScanConfig, parse_size};
use fimscan_scan::{ScanSummary, Scanner};

#[derive(Parser)]
#[command(
    name = "fimscan",
    version,
    about = "A rate-limited file integrity scanner",
    long_about = "fimscan walks directory trees and reports metadata and content \
                  hashes for every entry it finds.\n\n\
                  Hashing I/O can be throttled with --rate so a scan does not \
                  starve other workloads. Press Ctrl-C to stop a running scan."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan paths and print an event per entry
    Scan {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Paths to scan, in order
    paths: Vec<PathBuf>,

    /// Load settings from a JSON file; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Do not hash files larger than this (e.g., "100MiB", "1GB")
    #[arg(short = 's', long, value_parser = parse_size)]
    max_file_size: Option<u64>,

    /// Hash algorithms to compute (blake3, sha256, sha512, xxh3)
    #[arg(long = "hash", value_delimiter = ',')]
    hash_types: Vec<HashType>,

    /// Limit hashing I/O to this many bytes per second (e.g., "50MiB")
    #[arg(long, value_parser = parse_size)]
    rate: Option<u64>,

    /// Skip paths matching this glob; may be repeated
    #[arg(short, long)]
    exclude: Vec<String>,
}

impl ConfigArgs {
    /// Merge the optional config file with command line flags.
    fn into_config(self) -> Result<ScanConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => ScanConfig::default(),
        };

        if !self.paths.is_empty() {
            config.paths = self.paths;
        }
        config.recursive |= self.recursive;
        if let Some(max_file_size) = self.max_file_size {
            config.max_file_size = max_file_size;
        }
        if !self.hash_types.is_empty() {
            config.hash_types = self.hash_types;
        }
        if self.rate.is_some() {
            config.scan_rate_bytes_per_sec = self.rate;
        }
        config.exclude_patterns.extend(self.exclude);

        if config.paths.is_empty() {
            bail!("No paths to scan");
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan { config, format } => {
            run_scan(config.into_config()?, format).await?;
        }
        Command::Config { config } => {
            println!("{}", serde_json::to_string_pretty(&config.into_config()?)?);
        }
    }

    Ok(())
}

/// Run a scan, printing events as they arrive.
async fn run_scan(config: ScanConfig, format: OutputFormat) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, stopping scan...");
            on_interrupt.cancel();
        }
    });

    let start = Instant::now();
    let scanner = Scanner::new(config);
    let counters = scanner.counters();
    let mut events = scanner.start(cancel.clone()).context("Failed to start scan")?;

    while let Some(event) = events.recv().await {
        match format {
            OutputFormat::Text => println!("{}", format_event(&event)),
            OutputFormat::Json => println!("{}", serde_json::to_string(&event)?),
        }
    }

    print_summary(&counters.summary(start.elapsed()), cancel.is_cancelled());
    Ok(())
}

/// One line per event: type, size, first digest, path.
fn format_event(event: &Event) -> String {
    let kind = match event.info.as_ref().map(|info| info.file_type) {
        Some(FileType::File) => "file",
        Some(FileType::Dir) => "dir",
        Some(FileType::Symlink) => "link",
        Some(FileType::Other) => "other",
        None => "?",
    };
    let size = event.size().map(format_size).unwrap_or_default();
    let digest = event
        .hashes
        .iter()
        .next()
        .map(|(kind, digest)| format!("{kind}:{digest}"))
        .unwrap_or_else(|| "-".to_string());

    let mut line = format!("{kind:<5} {size:>10}  {digest:<24.24}  {}", event.path.display());
    if let Some(target) = &event.target_path {
        line.push_str(&format!(" -> {}", target.display()));
    }
    for error in &event.errors {
        line.push_str(&format!("  [{} error: {}]", error.stage, error.message));
    }
    line
}

fn print_summary(summary: &ScanSummary, interrupted: bool) {
    eprintln!();
    eprintln!("{}", "─".repeat(60));
    eprintln!(
        " {} {} entries, {} in {:.2}s",
        if interrupted { "Stopped after" } else { "Scanned" },
        summary.file_count,
        format_size(summary.total_bytes),
        summary.elapsed.as_secs_f64()
    );
    eprintln!(
        " {}/s, {:.1} entries/s",
        format_size(summary.bytes_per_second() as u64),
        summary.files_per_second()
    );
    eprintln!("{}", "─".repeat(60));
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
