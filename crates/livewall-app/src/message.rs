//! Messages consumed by the engine control loop

use crate::timer::TimerId;

/// Everything that can happen to the supervisor besides a process exit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────
    /// Start supervising the renderer
    Enable,
    /// Stop the renderer and do not restart it
    Disable,
    /// Terminate the renderer so it is relaunched
    KillCurrentProcess,
    /// Disable, wait for the renderer to exit, then leave the loop
    Quit,

    // ─────────────────────────────────────────────────────────
    // Timers
    // ─────────────────────────────────────────────────────────
    /// A one-shot restart timer elapsed
    RestartTimerFired { timer: TimerId },

    // ─────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────
    /// Re-read the config file and relaunch (file change or SIGHUP)
    ReloadSettings,
    /// Config watcher error occurred
    WatcherError { message: String },
}
