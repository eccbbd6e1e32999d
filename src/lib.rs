pub mod address;
pub mod aggregator;
pub mod endpoints;
pub mod indexer;
pub mod mediator;
pub mod model;
pub mod search;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};

use aggregator::Aggregator;
use endpoints::DiscoveryConfig;
use model::{MoveCommand, TabRecord};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "tabctl",
    version,
    about = "Control and search browser tabs across all attached browsers"
)]
pub struct Cli {
    /// Search store directory (defaults to the platform data dir)
    #[arg(long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all tabs: `prefix.window.tab<TAB>title<TAB>url`
    List,
    /// Close tabs by global ID (reads IDs from stdin when none are given)
    Close {
        /// Tab IDs to close
        tab_ids: Vec<String>,
    },
    /// Activate the given tab
    Activate {
        /// Tab ID in `prefix.window.tab` form
        tab_id: String,
    },
    /// Show the active tab of every endpoint
    Active,
    /// Open URLs from stdin (one per line) in an endpoint
    Open {
        /// Endpoint prefix, optionally with a window: `b` or `b.20`
        prefix_window_id: String,
    },
    /// Move tabs; reads `tab_id<TAB>window_id<TAB>index` lines from stdin
    Move,
    /// Extract text from all tabs as TSV
    Text {
        /// Write TSV to this file instead of stdout
        #[arg(long)]
        tsv: Option<PathBuf>,

        /// Collapse whitespace runs in the extracted text
        #[arg(long, default_value_t = false)]
        cleanup: bool,
    },
    /// Sorted unique words from the given (or all active) tabs
    Words {
        /// Tab IDs to pull words from
        tab_ids: Vec<String>,
    },
    /// Per-window tab counts: `prefix.window<TAB>count`
    Windows,
    /// Show discovered endpoints and their addresses
    Clients,
    /// (Re)build the search store from tab text
    Index {
        /// Index this TSV snapshot instead of querying live endpoints
        #[arg(long)]
        tsv: Option<PathBuf>,
    },
    /// Ranked full-text search over the store
    Search {
        /// Query string (tantivy syntax passes through)
        query: String,

        /// Maximum number of hits
        #[arg(long, default_value_t = 30)]
        limit: usize,

        /// Emit hits as JSON instead of TSV
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = cli.store.clone().unwrap_or_else(default_store_dir);

    match cli.command {
        Commands::List => {
            let aggregator = connect().await?;
            print_records(&aggregator.list_tabs().await);
        }
        Commands::Close { tab_ids } => {
            let tab_ids = ids_or_stdin(tab_ids)?;
            info!(count = tab_ids.len(), "closing tabs");
            connect().await?.close_tabs(&tab_ids).await;
        }
        Commands::Activate { tab_id } => {
            connect().await?.activate_tab(&tab_id).await;
        }
        Commands::Active => {
            let aggregator = connect().await?;
            print_records(&aggregator.get_active_tabs().await);
        }
        Commands::Open { prefix_window_id } => {
            let (prefix, window_id) = parse_prefix_window(&prefix_window_id)?;
            let urls: Vec<String> = read_stdin()?
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            info!(count = urls.len(), prefix = %prefix, "opening urls");
            connect()
                .await?
                .open_urls(&urls, prefix, window_id.as_deref())
                .await;
        }
        Commands::Move => {
            let moves: Vec<MoveCommand> = read_stdin()?
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| match MoveCommand::from_tsv_line(line) {
                    Ok(cmd) => Some(cmd),
                    Err(err) => {
                        warn!(error = %err, "dropping unparseable move line");
                        None
                    }
                })
                .collect();
            connect().await?.move_tabs(moves).await;
        }
        Commands::Text { tsv, cleanup } => {
            let aggregator = connect().await?;
            let mut records = aggregator.get_text(&[]).await;
            if cleanup {
                for record in &mut records {
                    record.cleanup_text();
                }
            }
            match tsv {
                Some(path) => write_tsv(&path, &records)?,
                None => print_records(&records),
            }
        }
        Commands::Words { tab_ids } => {
            let aggregator = connect().await?;
            for word in aggregator.get_words(&tab_ids).await {
                println!("{word}");
            }
        }
        Commands::Windows => {
            let aggregator = connect().await?;
            for (window, count) in aggregator::group_windows(&aggregator.list_tabs().await) {
                println!("{window}\t{count}");
            }
        }
        Commands::Clients => {
            let aggregator = connect().await?;
            for client in aggregator.clients() {
                println!("{}\t{}", client.prefix(), client.address());
            }
        }
        Commands::Index { tsv } => match tsv {
            Some(path) => indexer::index_tsv(&store, &path, false)?,
            None => {
                let aggregator = connect().await?;
                let mut records = aggregator.get_text(&[]).await;
                for record in &mut records {
                    record.cleanup_text();
                }
                let snapshot = default_snapshot_path();
                write_tsv(&snapshot, &records)?;
                info!(snapshot = %snapshot.display(), "live tab text captured");
                indexer::index_records(&store, records, false)?;
            }
        },
        Commands::Search { query, limit, json } => {
            let hits = search::search(&store, &query, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                for hit in hits {
                    println!("{}\t{}\t{}", hit.tab_id, hit.title, hit.snippet);
                }
            }
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tabctl", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Discover live endpoints and wrap them in an aggregator. Zero live
/// endpoints is not an error: operations just produce empty output.
async fn connect() -> Result<Aggregator> {
    let config = DiscoveryConfig::from_env();
    let found = endpoints::discover(&config).await;
    if found.is_empty() {
        info!("no mediator endpoints discovered, results will be empty");
    }
    Aggregator::new(found, config.request_timeout)
}

fn print_records(records: &[TabRecord]) {
    for record in records {
        println!("{}", record.to_tsv_line());
    }
}

fn write_tsv(path: &PathBuf, records: &[TabRecord]) -> Result<()> {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.to_tsv_line());
        out.push('\n');
    }
    std::fs::write(path, out).with_context(|| format!("write tsv to {}", path.display()))
}

fn ids_or_stdin(tab_ids: Vec<String>) -> Result<Vec<String>> {
    if !tab_ids.is_empty() {
        return Ok(tab_ids);
    }
    Ok(read_stdin()?
        .split_whitespace()
        .map(str::to_string)
        .collect())
}

fn read_stdin() -> Result<String> {
    std::io::read_to_string(std::io::stdin()).context("read stdin")
}

/// `b` selects an endpoint, `b.20` an endpoint plus one of its windows.
fn parse_prefix_window(value: &str) -> Result<(char, Option<String>)> {
    let (prefix, window_id) = match value.split_once('.') {
        Some((prefix, window_id)) => (prefix, Some(window_id.to_string())),
        None => (value, None),
    };
    let mut chars = prefix.chars();
    match (chars.next(), chars.next()) {
        (Some(p), None) if p.is_ascii_lowercase() => Ok((p, window_id)),
        _ => anyhow::bail!("expected `<prefix>` or `<prefix>.<window_id>`, got `{value}`"),
    }
}

pub fn default_store_dir() -> PathBuf {
    project_data_dir().join("index")
}

fn default_snapshot_path() -> PathBuf {
    project_data_dir().join("tabs.tsv")
}

pub fn project_data_dir() -> PathBuf {
    let dir = directories::ProjectDirs::from("com", "tabctl", "tabctl")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir);
    // Best effort; callers surface the real error on first write.
    let _ = std::fs::create_dir_all(&dir);
    dir
}
