//! EmberKV Server Binary
//!
//! Recovers the data directory and starts the TCP server.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use emberkv::network::Server;
use emberkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// EmberKV Server
#[derive(Parser, Debug)]
#[command(name = "emberkv-server")]
#[command(about = "Durable key-value store with a write-ahead journal")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./emberkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Seconds between background checkpoints (0 disables them)
    #[arg(short = 'c', long, default_value = "10")]
    checkpoint_secs: u64,

    /// Drop a truncated final log record instead of refusing to start
    #[arg(long)]
    tolerate_torn_tail: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,emberkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("EmberKV Server v{}", emberkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .tolerate_torn_tail(args.tolerate_torn_tail);
    builder = match args.checkpoint_secs {
        0 => builder.disable_checkpoints(),
        secs => builder.checkpoint_interval(Duration::from_secs(secs)),
    };
    let config = builder.build();

    // Unknown on-disk state must never be served
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized at version {}", engine.version());

    let checkpoints = match engine.spawn_checkpoint_loop() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to start checkpoint loop: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Some(checkpoints) = checkpoints {
        checkpoints.shutdown();
    }
    if let Err(e) = engine.checkpoint_if_needed() {
        tracing::error!("Final checkpoint failed: {}", e);
    }

    tracing::info!("Server stopped");
}
