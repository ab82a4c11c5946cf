//! Wayback-Lite main entry point
//!
//! This is the command-line interface for capturing websites into browsable
//! offline snapshots and inspecting the archive.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use wayback_lite::config::{load_config_with_hash, validate, Config};
use wayback_lite::crawler::FetchStrategy;
use wayback_lite::output::{
    format_progress, print_capture, print_diff, print_manifest, print_snapshot_list,
    write_markdown_diff,
};
use wayback_lite::storage::{FsStorage, Storage};
use wayback_lite::url::{extract_host, parse_seed};
use wayback_lite::{Pipeline, ProgressRegistry, TriggerRequest};
use tracing_subscriber::EnvFilter;

/// Wayback-Lite: point-in-time snapshots of websites
///
/// Wayback-Lite crawls a site within its origin, stores every fetched page and
/// asset under a timestamped directory, and rewrites references so the copy
/// can be browsed offline.
#[derive(Parser, Debug)]
#[command(name = "wayback-lite")]
#[command(version)]
#[command(about = "Capture browsable offline snapshots of websites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site and store a new snapshot
    Capture {
        /// Seed URL
        url: String,

        /// Page budget (1-50)
        #[arg(long)]
        max_pages: Option<usize>,

        /// Fetch strategy tried first (http or browser)
        #[arg(long)]
        strategy: Option<FetchStrategy>,

        /// Do not retry with the other strategy if the first one fails
        #[arg(long)]
        no_fallback: bool,
    },

    /// List the snapshots stored for a URL's host
    List {
        url: String,
    },

    /// Show every host and its snapshot timestamps
    Manifest {
        /// Print the manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a stored file verbatim
    Raw {
        host: String,
        timestamp: String,
        /// Path relative to the snapshot directory, e.g. `_/img/a.png`
        path: String,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare two snapshots of a host
    Diff {
        host: String,
        from: String,
        to: String,
        /// Also write a markdown report to this file
        #[arg(long, value_name = "FILE")]
        markdown: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_deref())?;

    match cli.command {
        Command::Capture {
            url,
            max_pages,
            strategy,
            no_fallback,
        } => handle_capture(config, url, max_pages, strategy, no_fallback, cli.quiet).await,
        Command::List { url } => handle_list(&config, &url),
        Command::Manifest { json } => handle_manifest(&config, json),
        Command::Raw {
            host,
            timestamp,
            path,
            output,
        } => handle_raw(&config, &host, &timestamp, &path, output),
        Command::Diff {
            host,
            from,
            to,
            markdown,
        } => handle_diff(&config, &host, &from, &to, markdown),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wayback_lite=info,warn"),
            1 => EnvFilter::new("wayback_lite=debug,info"),
            2 => EnvFilter::new("wayback_lite=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the configuration file, or the defaults when none is given
fn load_configuration(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            let config = Config::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

fn open_storage(config: &Config) -> anyhow::Result<FsStorage> {
    let root = config.output.data_path();
    FsStorage::open(&root).with_context(|| format!("failed to open data directory {}", root.display()))
}

/// Handles `capture`: runs the pipeline and streams its progress
async fn handle_capture(
    mut config: Config,
    url: String,
    max_pages: Option<usize>,
    strategy: Option<FetchStrategy>,
    no_fallback: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    if let Some(strategy) = strategy {
        config.crawler.strategy = strategy;
    }
    if no_fallback {
        config.crawler.fallback = false;
    }

    let registry = ProgressRegistry::new();
    let pipeline = Pipeline::open(config, registry.clone())?;

    let progress_id = format!("cli-{}", std::process::id());
    let mut events = registry.subscribe(&progress_id);
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if !quiet {
                eprintln!("{}", format_progress(&event));
            }
        }
    });

    let mut request = TriggerRequest::new(url).with_progress_id(progress_id);
    request.max_pages = max_pages;

    let result = pipeline.run(request).await;
    // The pipeline drops the subscription when it ends, which ends the printer
    if let Err(e) = printer.await {
        tracing::warn!("Progress printer failed: {}", e);
    }

    let outcome = result?;
    print_capture(&outcome);
    Ok(())
}

/// Handles `list`: shows the snapshots of a URL's host
fn handle_list(config: &Config, url: &str) -> anyhow::Result<()> {
    let url = parse_seed(url)?;
    let host = extract_host(&url).unwrap_or_default();
    let storage = open_storage(config)?;

    let timestamps = storage.list_by_host(&url)?;
    print_snapshot_list(&host, &timestamps);
    Ok(())
}

/// Handles `manifest`: shows every recorded capture
fn handle_manifest(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let manifest = storage.manifest()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    } else {
        print_manifest(&manifest);
    }
    Ok(())
}

/// Handles `raw`: copies a stored file to stdout or a file
fn handle_raw(
    config: &Config,
    host: &str,
    timestamp: &str,
    path: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let bytes = storage.read_raw(host, timestamp, path)?;

    match output {
        Some(output) => std::fs::write(&output, &bytes)
            .with_context(|| format!("failed to write {}", output.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Handles `diff`: compares two snapshots of one host
fn handle_diff(
    config: &Config,
    host: &str,
    from: &str,
    to: &str,
    markdown: Option<PathBuf>,
) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let diff = storage.diff(host, from, to)?;

    print_diff(host, &diff);

    if let Some(path) = markdown {
        write_markdown_diff(host, &diff, &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("✓ Markdown report written to: {}", path.display());
    }
    Ok(())
}
