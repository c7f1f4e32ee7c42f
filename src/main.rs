//! Resilient RPC probe (v1)
//!
//! Issues cached JSON-RPC reads through the failover layer and prints the
//! resulting diagnostics.
//!
//! # Architecture Overview
//!
//! ```text
//!     --method/--params
//!          │
//!          ▼
//!     ┌──────────┐  miss/stale   ┌──────────────────┐  per endpoint  ┌───────────┐
//!     │ SwrCache │──────────────▶│ FailoverExecutor │───────────────▶│ transport │──▶ RPC node
//!     └──────────┘               └────────┬─────────┘                └───────────┘
//!                                         │ outcomes
//!                                         ▼
//!                                  ┌──────────────┐
//!                                  │ ErrorTracker │──▶ diagnostics JSON
//!                                  └──────────────┘
//!
//!     config file ──▶ ConfigWatcher ──▶ endpoint list swap
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use resilient_rpc::config::watcher::ConfigWatcher;
use resilient_rpc::config::{load_config, AccessConfig};
use resilient_rpc::observability::{logging, metrics};
use resilient_rpc::RpcClient;

#[derive(Parser)]
#[command(name = "resilient-rpc")]
#[command(about = "Cached, failover-aware JSON-RPC reads with health diagnostics", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Endpoint URL; repeatable. Overrides the configured list.
    #[arg(short, long = "endpoint")]
    endpoints: Vec<String>,

    /// JSON-RPC method to call.
    #[arg(short, long, default_value = "getSlot")]
    method: String,

    /// JSON-RPC params as a JSON value.
    #[arg(short, long, default_value = "[]")]
    params: String,

    /// Scope cache entries to this owner (e.g. a wallet address).
    #[arg(long)]
    owner: Option<String>,

    /// Number of calls to make.
    #[arg(short, long, default_value_t = 1)]
    repeat: u32,

    /// Pause between calls in milliseconds.
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Reload endpoints when the config file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AccessConfig::default(),
    };
    if !cli.endpoints.is_empty() {
        config.endpoints.urls = cli.endpoints.clone();
    }

    logging::init_logging(&config.observability);
    tracing::info!("resilient-rpc v0.1.0 starting");

    if config.endpoints.urls.is_empty() {
        return Err("no endpoints configured; pass --endpoint or --config".into());
    }

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let params: serde_json::Value = serde_json::from_str(&cli.params)?;
    let client = RpcClient::from_config(&config)?;

    // Held for the lifetime of the run; dropping it stops the watch.
    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, mut updates) = ConfigWatcher::new(path, config.clone());
            let handle = watcher.run()?;
            let reload_client = client.clone();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    reload_client.set_endpoints(new_config.endpoints.urls);
                }
            });
            Some(handle)
        }
        (None, true) => {
            tracing::warn!("--watch ignored without --config");
            None
        }
        _ => None,
    };

    for round in 0..cli.repeat {
        if round > 0 {
            tokio::time::sleep(Duration::from_millis(cli.interval_ms)).await;
        }

        let result = match &cli.owner {
            Some(owner) => {
                client
                    .call_for_owner(owner, &cli.method, params.clone(), config.cache.clone().into())
                    .await
            }
            None => client.call(&cli.method, params.clone()).await,
        };

        match result {
            Ok(cached) => {
                tracing::info!(
                    round,
                    from_cache = cached.from_cache,
                    is_stale = cached.is_stale,
                    "Call succeeded"
                );
                println!("{}", serde_json::to_string(&cached.data)?);
            }
            Err(e) => {
                tracing::error!(round, error = %e, kind = e.kind().as_str(), "Call failed");
            }
        }
    }

    println!("{}", client.diagnostics().to_json_pretty()?);
    Ok(())
}
