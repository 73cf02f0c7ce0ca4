//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Initialize the logging subsystem for one component (`robind` or
/// `robin-worker`; each gets its own log file so the two processes
/// never interleave).
///
/// Logs are written to `~/.local/share/road-robin/logs/`.
/// Log level is controlled by the `ROBIN_LOG` environment variable.
///
/// # Examples
/// ```bash
/// ROBIN_LOG=debug robind
/// ROBIN_LOG=trace robin-worker Ken
/// ```
pub fn init(component: &str) -> Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, &log_dir, format!("{component}.log"));

    // Default to info, allow override via ROBIN_LOG
    let env_filter = EnvFilter::try_from_env("ROBIN_LOG")
        .unwrap_or_else(|_| EnvFilter::new("robin_core=info,robin_worker=info,robin_server=info,road_robin=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("Road Robin {component} starting");
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("road-robin").join("logs"))
}
