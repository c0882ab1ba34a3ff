//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Renderer Process Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Renderer entry point not found: {path}")]
    RendererNotFound { path: PathBuf },

    #[error("Renderer launch arguments are empty")]
    EmptyArgv,

    #[error("Failed to spawn renderer process: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Renderer process error: {message}")]
    Process { message: String },

    #[error("Failed to signal process {pid}: {message}")]
    Signal { pid: u32, message: String },

    #[error("Process table unavailable: {message}")]
    ProcessTable { message: String },

    // ─────────────────────────────────────────────────────────────
    // Windowing Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Window ownership query failed: {message}")]
    WindowQuery { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    #[error("Config watcher error: {message}")]
    Watcher { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn renderer_not_found(path: impl Into<PathBuf>) -> Self {
        Self::RendererNotFound { path: path.into() }
    }

    pub fn process_spawn(reason: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            reason: reason.into(),
        }
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    pub fn signal(pid: u32, message: impl Into<String>) -> Self {
        Self::Signal {
            pid,
            message: message.into(),
        }
    }

    pub fn process_table(message: impl Into<String>) -> Self {
        Self::ProcessTable {
            message: message.into(),
        }
    }

    pub fn window_query(message: impl Into<String>) -> Self {
        Self::WindowQuery {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn watcher(message: impl Into<String>) -> Self {
        Self::Watcher {
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions (for use with color-eyre)
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }
}
