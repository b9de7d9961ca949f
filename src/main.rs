//! Fiction-Harvest main entry point
//!
//! This is the command-line interface for the Fiction-Harvest crawler.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use fiction_harvest::checkpoint::{Checkpoint, CheckpointStore};
use fiction_harvest::config::{load_config_or_default, load_config_with_hash, Config};
use fiction_harvest::crawler::{run_crawl, run_refresh, ShutdownSignal};
use fiction_harvest::output::{load_statistics, print_checkpoint, print_statistics};
use fiction_harvest::storage::open_repository;
use fiction_harvest::CrawlState;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Configuration file looked up when `--config` is not given
const DEFAULT_CONFIG_PATH: &str = "harvest.toml";

/// Fiction-Harvest: a resumable crawler for ranked fiction listings
///
/// Walks the best-rated listing page by page, stores every linked fiction
/// in a local SQLite database and checkpoints after each page so that an
/// interrupted crawl picks up where it left off.
#[derive(Parser, Debug)]
#[command(name = "fiction-harvest")]
#[command(version)]
#[command(about = "A resumable crawler for ranked fiction listings", long_about = None)]
struct Cli {
    /// Path to TOML configuration file [default: harvest.toml, if present]
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the listing, resuming from the checkpoint (default)
    Crawl {
        /// Validate config and show what would be crawled without crawling
        #[arg(long)]
        dry_run: bool,
    },

    /// Re-fetch every stored fiction to update its metadata
    Refresh {
        /// Forget the refresh cursor and start from the lowest identifier
        #[arg(long)]
        restart: bool,
    },

    /// Show statistics from the database and exit
    Stats,

    /// Inspect or edit the crawl checkpoint
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },
}

#[derive(Subcommand, Debug)]
enum CheckpointAction {
    /// Print the saved checkpoint
    Show,

    /// Delete the checkpoint so the next crawl starts from page 1
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Overwrite the checkpoint with explicit values
    Set {
        /// Next listing page to fetch
        #[arg(long)]
        page: u32,

        /// Cumulative fictions scraped
        #[arg(long)]
        total: u64,

        /// Last ingested fiction identifier
        #[arg(long)]
        last_id: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_configuration(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Crawl { dry_run: false }) {
        Command::Crawl { dry_run: true } => handle_dry_run(&config),
        Command::Crawl { dry_run: false } => handle_crawl(&config).await,
        Command::Refresh { restart } => handle_refresh(&config, restart).await,
        Command::Stats => handle_stats(&config),
        Command::Checkpoint { action } => handle_checkpoint(&config, action),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("fiction_harvest=info,warn"),
            1 => EnvFilter::new("fiction_harvest=debug,info"),
            2 => EnvFilter::new("fiction_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the explicit config file, or the default one if it exists
fn load_configuration(path: Option<&Path>) -> anyhow::Result<Config> {
    let (config, hash) = match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            (config, Some(hash))
        }
        None => load_config_or_default(Path::new(DEFAULT_CONFIG_PATH))
            .with_context(|| format!("Failed to load configuration {}", DEFAULT_CONFIG_PATH))?,
    };

    match hash {
        Some(hash) => tracing::info!("Configuration loaded successfully (hash: {})", hash),
        None => tracing::info!("No configuration file found, using built-in defaults"),
    }

    Ok(config)
}

/// Handles `crawl --dry-run`: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Fiction-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Listing: {}", config.site.listing_path);
    println!("  Detail prefix: {}", config.site.detail_path);

    println!("\nCrawler:");
    println!(
        "  Listing delay: {}s + up to {}s",
        config.crawler.page_delay_secs, config.crawler.page_jitter_secs
    );
    println!(
        "  Fiction delay: {}s + up to {}s",
        config.crawler.fiction_delay_secs, config.crawler.fiction_jitter_secs
    );
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Max novels: {}", config.crawler.max_novels);
    println!("  Timeout: {}s", config.crawler.timeout_secs);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);

    let checkpoint = CheckpointStore::open(&config.output.checkpoint_path);
    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start at page {} with {} fictions already scraped",
        checkpoint.current().current_page,
        checkpoint.current().total_scraped
    );

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    let shutdown = ShutdownSignal::new();
    let listener = shutdown.listen_for_interrupts();

    let result = run_crawl(config, shutdown).await;
    listener.abort();

    let report = result.context("Crawl failed")?;
    match report.state {
        CrawlState::Paused => {
            println!(
                "Crawl paused. Resume with the same command to continue from page {}",
                report.next_page
            );
        }
        state => {
            println!(
                "Crawl {}: {} fictions this run, {} total. Next page: {}",
                state, report.ingested_this_run, report.total_scraped, report.next_page
            );
        }
    }

    Ok(())
}

/// Handles the refresh pass
async fn handle_refresh(config: &Config, restart: bool) -> anyhow::Result<()> {
    let shutdown = ShutdownSignal::new();
    let listener = shutdown.listen_for_interrupts();

    let result = run_refresh(config, shutdown, restart).await;
    listener.abort();

    let report = result.context("Refresh failed")?;
    println!(
        "Refresh {}: {} updated, {} failed, last ID {}",
        if report.interrupted { "paused" } else { "complete" },
        report.updated,
        report.failed,
        report.last_processed_id
    );

    Ok(())
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let db_path = Path::new(&config.output.database_path);
    if !db_path.exists() {
        bail!("Database {} does not exist yet", db_path.display());
    }

    println!("Database: {}\n", db_path.display());

    let repository = open_repository(db_path)?;
    let checkpoint = CheckpointStore::open(&config.output.checkpoint_path);
    let stats = load_statistics(&repository, checkpoint.current())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the checkpoint utility subcommands
fn handle_checkpoint(config: &Config, action: CheckpointAction) -> anyhow::Result<()> {
    let mut store = CheckpointStore::open(&config.output.checkpoint_path);

    match action {
        CheckpointAction::Show => {
            println!("File: {}\n", store.path().display());
            print_checkpoint(store.current());
        }
        CheckpointAction::Clear { yes } => {
            if !yes && !confirm("Delete the checkpoint and restart from page 1?")? {
                println!("Cancelled");
                return Ok(());
            }
            store.clear()?;
            println!("✓ Checkpoint cleared");
        }
        CheckpointAction::Set {
            page,
            total,
            last_id,
        } => {
            if page == 0 {
                bail!("--page must be at least 1");
            }
            let saved = store.overwrite(Checkpoint {
                current_page: page,
                total_scraped: total,
                last_fiction_id: last_id,
                timestamp: None,
            })?;
            println!("✓ Checkpoint updated\n");
            print_checkpoint(&saved);
        }
    }

    Ok(())
}

/// Asks a yes/no question on stdin; only `yes` or `y` confirms
fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} Type 'yes' to confirm: ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();

    Ok(answer == "yes" || answer == "y")
}
