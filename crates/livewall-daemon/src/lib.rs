//! # livewall-daemon - Renderer Process Management
//!
//! Spawns and tracks the renderer child process, relays its output, cleans up
//! renderers left behind by an earlier supervisor, and answers window
//! ownership queries on the Wayland path.
//!
//! Depends on [`livewall_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Process Management
//! - [`ProcessHandle`] - One renderer child process and its lifecycle
//! - [`OutputRelay`] - Line-by-line forwarding of renderer output
//! - [`send_terminate()`] - SIGTERM delivery
//!
//! ### Launch
//! - [`LaunchSpec`] - Renderer argv, working directory and command-line signature
//!
//! ### Stale Instances
//! - [`StaleInstanceReaper`] - Terminates renderers from a previous supervisor
//! - [`ProcessLister`], [`ProcFs`] - Process table access
//!
//! ### Window Ownership
//! - [`OwnershipQuery`] - Native or emulated ownership capability
//! - [`ProcessWindows`] - Window-facing half of a process handle
//! - [`WindowClient`] - Compositor client used by the native path
//! - [`WindowListFilter`] - Visibility table used by the emulated path

pub mod launch;
pub mod ownership;
pub mod process;
pub mod reaper;
pub mod relay;
pub mod signal;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Public API re-exports
pub use launch::{
    LaunchSpec, DEFAULT_INTERPRETER, DEFAULT_PLATFORM_MARKER, INSTALL_PATH_FLAG, RENDERER_ENTRY,
};
pub use ownership::{OwnershipQuery, ProcessWindows, WindowClient, WindowListFilter};
pub use process::ProcessHandle;
pub use reaper::{ProcFs, ProcessEntry, ProcessLister, StaleInstanceReaper};
pub use relay::OutputRelay;
pub use signal::send_terminate;
