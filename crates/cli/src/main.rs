use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use specdeck_http::{create_router, AppState};
use specdeck_index::{build_shards, find_operation, load_registry, SearchParams};
use specdeck_parser::parse_log;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "specdeck")]
#[command(about = "Centralized API documentation portal", long_about = None)]
struct Cli {
    /// Path to the specs configuration JSON.
    #[arg(long, default_value = "specs.json", global = true)]
    specs: PathBuf,

    /// Directory holding the per-spec index shards.
    #[arg(long, default_value = ".specdeck-cache", global = true)]
    cache: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load all specs, build the index, and serve the HTTP API.
    Serve {
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        #[arg(short, long, default_value = "5001")]
        port: u16,
        /// Timeout for replayed requests, in seconds.
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
    /// Run one search against the index and print the hits as JSON.
    Search {
        query: String,
        /// Restrict to these spec names (repeatable).
        #[arg(short, long)]
        spec: Vec<String>,
        /// Restrict to these tags (repeatable).
        #[arg(short, long)]
        tag: Vec<String>,
        #[arg(short, long, default_value = "20")]
        limit: usize,
        #[arg(short, long, default_value = "0")]
        offset: usize,
    },
    /// Parse a captured request log and resolve it to an operation.
    Resolve {
        /// Log file to read, or `-` for stdin.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let registry = load_registry(&cli.specs, &cli.cache)?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            timeout,
        } => {
            let cancel = CancellationToken::new();
            let shutdown = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    shutdown.cancel();
                }
            });

            let alias = build_shards(&cli.cache, &registry, cancel.clone()).await?;

            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()
                .context("building replay client")?;
            let state = Arc::new(AppState {
                registry,
                alias,
                client,
            });
            let router = create_router(state);

            let addr = format!("{host}:{port}");
            tracing::info!("Starting HTTP server on {}", addr);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await?;
        }
        Commands::Search {
            query,
            spec,
            tag,
            limit,
            offset,
        } => {
            let alias = build_shards(&cli.cache, &registry, CancellationToken::new()).await?;
            let params = SearchParams {
                query,
                specs: spec,
                tags: tag,
                limit,
                offset,
            };
            let (results, total) = alias.search(&params)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "total": total,
                    "results": results
                }))?
            );
        }
        Commands::Resolve { file } => {
            let alias = build_shards(&cli.cache, &registry, CancellationToken::new()).await?;
            let parsed = if file.as_os_str() == "-" {
                let mut buf = Vec::new();
                std::io::stdin().read_to_end(&mut buf)?;
                parse_log(buf.as_slice())?
            } else {
                let data = std::fs::read(&file)
                    .with_context(|| format!("reading {}", file.display()))?;
                parse_log(data.as_slice())?
            };
            let resolved = find_operation(&alias, &registry, &parsed.method, &parsed.uri)?;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
    }

    Ok(())
}
