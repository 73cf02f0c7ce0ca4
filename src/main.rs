//! Road Robin control-plane daemon
//!
//! This is the binary entry point. All logic lives in the library crates.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use robin_core::prelude::*;
use robin_server::{AppState, OsBackend, StatusBroadcaster, Supervisor};

/// Road Robin control plane - supervises the detection worker and
/// relays its status to subscribers
#[derive(Parser, Debug)]
#[command(name = "robind")]
#[command(about = "Control plane for the Road Robin driving aid", long_about = None)]
struct Args {
    /// Listen port (default from .robin/config.toml, 5000 out of the box)
    #[arg(long)]
    port: Option<u16>,

    /// Path to the robin-worker binary
    #[arg(long, value_name = "PATH")]
    worker: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    robin_core::logging::init("robind")?;

    let args = Args::parse();
    let settings = robin_core::Settings::load()?;

    let port = args.port.unwrap_or(settings.control_port);
    let worker_path = args.worker.unwrap_or_else(default_worker_path);
    info!("Worker binary: {}", worker_path.display());

    let broadcaster = StatusBroadcaster::new();
    let supervisor = Arc::new(Supervisor::new(
        OsBackend::new(),
        broadcaster.clone(),
        worker_path,
    ));
    let state = AppState {
        supervisor,
        broadcaster,
    };

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    robin_server::serve(listener, state).await?;
    Ok(())
}

/// Prefer a robin-worker sitting next to this executable; otherwise let
/// the spawn resolve the bare name through PATH.
fn default_worker_path() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let sibling = exe.with_file_name("robin-worker");
        if sibling.exists() {
            return sibling;
        }
    }
    PathBuf::from("robin-worker")
}
