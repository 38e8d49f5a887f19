use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use followgraph::fetch::{normalize_profile_identifier, Authenticator, ReplayFetcher};
use followgraph::storage::{GraphRepository, RunRecorder, TieredStore};
use followgraph::{Config, Crawler};

#[derive(Parser, Debug)]
#[command(name = "followgraph")]
#[command(about = "Incremental breadth-first crawler for streaming-platform follow graphs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the follow graph outward from a profile
    Scrape {
        /// Profile ID or URL to crawl
        profile: String,

        /// Maximum graph depth to crawl
        #[arg(long, default_value_t = 1)]
        depth: usize,

        /// Capture file backing the replay fetcher
        #[arg(long)]
        capture: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Scrape {
            profile,
            depth,
            capture,
        } => scrape(&profile, depth, &capture),
    }
}

fn scrape(profile: &str, depth: usize, capture: &PathBuf) -> Result<()> {
    let config = Config::load()?;

    if depth == 0 {
        anyhow::bail!("depth must be at least 1");
    }
    if depth > config.crawl.max_depth {
        log::warn!(
            "Requested depth {} exceeds configured max {}; temporarily raising limit",
            depth,
            config.crawl.max_depth
        );
    }

    let root = normalize_profile_identifier(profile);

    let mut fetcher = ReplayFetcher::from_file(capture, config.base_url())?;

    // Authentication failure is fatal: no partial crawl is attempted
    let auth = fetcher.login();
    if !auth.success {
        log::error!(
            "Login failed: {}",
            auth.error.as_deref().unwrap_or("UNKNOWN_ERROR")
        );
        std::process::exit(1);
    }
    log::info!("Authenticated successfully");

    let store = TieredStore::new(config.data_dir())?;
    let mut repository = GraphRepository::open(store)?;
    let mut recorder = RunRecorder::new();

    log::info!("Starting crawl for '{}' up to depth {}", root, depth);
    let report = {
        let mut crawler = Crawler::new(
            &mut fetcher,
            &mut repository,
            &mut recorder,
            &config.crawl,
        );
        crawler.crawl(&root, Some(depth))?
    };

    repository.persist()?;
    repository.archive_snapshot()?;
    let run_dir = recorder.write_manifest(config.results_dir(), &root, &repository)?;

    log::info!("=== Crawl Complete ===");
    log::info!("Nodes visited: {}", report.visited);
    log::info!(
        "Fetched fresh: {} (cache hits: {})",
        report.fetched,
        report.cache_hits
    );
    log::info!(
        "Pruned by threshold: {} (skipped on error: {})",
        report.pruned,
        report.skipped
    );
    log::info!("New edges: {}", report.edges_added);
    log::info!(
        "Repository now holds {} profiles and {} edges",
        repository.profile_count(),
        repository.edge_count()
    );
    log::info!("Run manifest: {}", run_dir.display());

    Ok(())
}
