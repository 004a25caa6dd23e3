//! # dynamickv - standalone key-value document store
//!
//! Binary entry point: parse flags, load configuration, open the store,
//! serve HTTP until interrupted.

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

use dynamickv_server::{Server, ServerConfig};

/// A minimal schemaless key-value document store served over HTTP.
///
/// Collections are created implicitly on first write and persisted as one
/// append-only log file each under the data directory. All settings can
/// also come from `dynamickv.toml` in the data directory or from
/// `DYNAMICKV_*` environment variables; flags win.
#[derive(Parser, Debug)]
#[command(name = "dynamickv", version, about = "Schemaless key-value document store over HTTP")]
struct Args {
    /// Address to listen on for HTTP traffic.
    #[arg(long)]
    addr: Option<String>,

    /// Path to the data directory where collection logs are stored.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Durability mode: "always" (fsync every write) or "standard".
    #[arg(long)]
    durability: Option<String>,

    /// Collection served by GET /api/search.
    #[arg(long)]
    search_collection: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let data_dir = ServerConfig::resolve_data_dir(args.data_dir);

    let mut config = match ServerConfig::load(data_dir) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };
    if let Some(addr) = args.addr {
        config.addr = addr;
    }
    if let Some(durability) = args.durability {
        config.durability = durability;
    }
    if let Some(search_collection) = args.search_collection {
        config.search_collection = search_collection;
    }

    let server = match Server::open(config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to open store");
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "server terminated");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }
}
