//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Where log output is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogTarget {
    /// Daily rolling file under the data directory
    #[default]
    File,
    /// Standard error, for running under a session manager or journald
    Stderr,
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Initialize the logging subsystem
///
/// File logs are written to `~/.local/share/livewall/logs/`.
/// Log level is controlled by `LIVEWALL_LOG` environment variable.
///
/// # Examples
/// ```bash
/// LIVEWALL_LOG=debug livewall
/// LIVEWALL_LOG=livewall=trace,renderer=info livewall --log-stderr
/// ```
pub fn init(target: LogTarget) -> Result<()> {
    // Default to info, allow override via LIVEWALL_LOG
    let env_filter = EnvFilter::try_from_env("LIVEWALL_LOG")
        .unwrap_or_else(|_| EnvFilter::new("livewall=info,renderer=info,warn"));

    match target {
        LogTarget::File => {
            let log_dir = get_log_directory()?;
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "livewall.log");

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
                        .with_timer(fmt::time::ChronoLocal::new(TIMESTAMP_FORMAT.to_string())),
                )
                .init();

            tracing::info!("═══════════════════════════════════════════════════════");
            tracing::info!("livewall starting");
            tracing::info!("Log directory: {}", log_dir.display());
            tracing::info!("═══════════════════════════════════════════════════════");
        }
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_timer(fmt::time::ChronoLocal::new(TIMESTAMP_FORMAT.to_string())),
                )
                .init();

            tracing::info!("livewall starting (logging to stderr)");
        }
    }

    Ok(())
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("livewall").join("logs"))
}

/// Get the log file path for the current day
pub fn get_current_log_file() -> Result<PathBuf> {
    let dir = get_log_directory()?;
    Ok(dir.join("livewall.log"))
}
