//! matchmilan - browse profile matches from the terminal.
//!
//! Pages through matches from the remote profile service, keeps every match
//! it has seen in a local store, and keeps working from that store when the
//! network is unavailable.

mod commands;
mod render;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use matchmilan_core::{
    Config, ConnectivityMonitor, JsonMatchStore, ManualConnectivity, MatchFeed, MatchStatus,
    NetworkMonitor, RandomUserClient, SyncOrchestrator,
};

use commands::{Command, Target, HELP};

/// Rolling log file name prefix (inside the data directory)
const LOG_FILE_NAME: &str = "matchmilan.log";

/// Initialize the tracing subscriber for logging.
/// Returns the file writer guard, which must live until exit.
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Connectivity for this run, plus the network monitor to shut down on exit.
async fn build_connectivity(
    config: &Config,
) -> (Arc<dyn ConnectivityMonitor>, Option<Arc<NetworkMonitor>>) {
    if config.offline {
        info!("Offline mode, serving stored matches only");
        let forced: Arc<dyn ConnectivityMonitor> = Arc::new(ManualConnectivity::new(false));
        return (forced, None);
    }

    let monitor = Arc::new(NetworkMonitor::new(
        config.probe_host.clone(),
        config.probe_interval(),
    ));
    // Seed the first reading so the initial load doesn't start out "offline"
    let online = monitor.check_now().await;
    info!(online = online, "Initial connectivity");
    let connectivity: Arc<dyn ConnectivityMonitor> = monitor.clone();
    (connectivity, Some(monitor))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let (mut config, config_error) = match Config::load() {
        Ok(c) => (c, None),
        Err(e) => (Config::default(), Some(e)),
    };
    config.apply_env(|key| std::env::var(key).ok());

    let log_dir = if config.log_to_file {
        config.data_dir().ok()
    } else {
        None
    };
    let _log_guard = init_tracing(log_dir);
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    } else if !Config::exists() {
        // First run: write the defaults out so they can be edited
        if let Err(e) = Config::default().save() {
            warn!(error = %e, "Failed to write default config");
        }
    }
    info!("matchmilan starting");

    let store_path = config.store_path()?;
    let store = Arc::new(
        JsonMatchStore::open(&store_path)
            .await
            .with_context(|| format!("Failed to open match store at {}", store_path.display()))?,
    );
    info!(path = %store.path().display(), stored = store.len().await, "Match store ready");

    let mut client = RandomUserClient::new(config.base_url.clone(), config.request_timeout())?;
    if let Some(ref seed) = config.seed {
        client = client.with_seed(seed.clone());
    }

    let (connectivity, monitor) = build_connectivity(&config).await;
    let sync = Arc::new(SyncOrchestrator::new(
        Arc::new(client),
        store.clone(),
        connectivity,
    ));

    let mut feed = MatchFeed::new(sync, config.page_size);
    feed.watch_connectivity();

    println!("{}\n", HELP);
    feed.load_more();
    feed.wait_for_load().await;
    print_new(&feed, 0);

    let result = run(&mut feed, &store).await;

    if let Some(monitor) = monitor {
        monitor.shutdown();
    }
    info!("matchmilan shutting down");
    result
}

fn print_new(feed: &MatchFeed, from: usize) {
    for line in render::records_from(feed.state(), from) {
        println!("{}", line);
    }
    println!("{}", render::summary(feed.state()));
}

fn resolve_target(feed: &MatchFeed, target: &Target) -> Option<String> {
    match target {
        Target::Index(n) => feed.records().get(n - 1).map(|r| r.id.clone()),
        Target::Id(id) => Some(id.clone()),
    }
}

async fn decide(feed: &mut MatchFeed, target: Target, status: MatchStatus) {
    let Some(id) = resolve_target(feed, &target) else {
        println!("No match at that position");
        return;
    };

    match feed.update_status(&id, status).await {
        Ok(0) => println!("No stored match with id {}", id),
        Ok(_) => println!("{} -> {}", id, status),
        Err(e) => println!("Could not update {}: {}", id, e),
    }
}

async fn run(feed: &mut MatchFeed, store: &JsonMatchStore) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        // Pick up connectivity changes that arrived while waiting on input
        feed.check_background_tasks();

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match command {
            Command::Help => println!("{}", HELP),
            Command::List => print_new(feed, 0),
            Command::Status => {
                feed.check_background_tasks();
                println!("{}", render::summary(feed.state()));
                println!(
                    "{}",
                    render::store_line(store.len().await, store.saved_at().await, Utc::now())
                );
            }
            Command::More => {
                let before = feed.records().len();
                if feed.load_more() {
                    feed.wait_for_load().await;
                    print_new(feed, before);
                } else if feed.is_loading() {
                    println!("Still loading...");
                } else {
                    println!("No more matches to load (try 'refresh')");
                }
            }
            Command::Refresh => {
                feed.refresh();
                feed.wait_for_load().await;
                print_new(feed, 0);
            }
            Command::Decide(target, status) => decide(feed, target, status).await,
            Command::Quit => return Ok(()),
        }
    }
}
