//! # livewall-core - Core Domain Types
//!
//! Foundation crate for livewall. Provides the error type, process lifecycle
//! events, the renderer log sink contract and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`ProcessId`] - Identity of one renderer launch attempt
//! - [`WindowRef`] - A window as reported by the shell
//! - [`Backoff`], [`BackoffLevels`] - Restart delay levels
//! - [`DisplayServer`] - X11 vs Wayland detection
//!
//! ### Events (`events`)
//! - [`ProcessEvent`] - Exit notifications from process background tasks
//! - [`ExitOutcome`], [`ExitKind`] - Exit status and its clean/abnormal classification
//!
//! ### Output (`sink`)
//! - [`LogSink`] - Destination for renderer output lines
//! - [`TracingSink`], [`CaptureSink`] - Tracing-backed and in-memory sinks
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use livewall_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod sink;
pub mod types;

/// Prelude for common imports used throughout all livewall crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use events::{ExitKind, ExitOutcome, ProcessEvent};
pub use logging::LogTarget;
pub use sink::{CaptureSink, CapturedLine, LogSink, TracingSink};
pub use types::{
    Backoff, BackoffLevels, DisplayServer, ProcessId, WindowRef, FAST_RELOAD_MS, SLOW_RELOAD_MS,
};
