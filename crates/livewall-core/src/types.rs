//! Core domain types shared by all livewall crates

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay before relaunching after a clean exit or deliberate kill
pub const FAST_RELOAD_MS: u64 = 100;

/// Default delay before relaunching after a crash or spawn failure
pub const SLOW_RELOAD_MS: u64 = 1000;

/// Identity of one renderer launch attempt.
///
/// Every spawn gets a fresh id. Exit notifications carry the id so the
/// supervisor can discard notifications for superseded processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A windowing-system window as seen by the shell.
///
/// `pid` is the client pid the compositor reports for the window, when known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowRef {
    pub id: u64,
    pub pid: Option<u32>,
    pub title: Option<String>,
}

impl WindowRef {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            pid: None,
            title: None,
        }
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Restart backoff level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Process exited cleanly or was replaced on purpose
    #[default]
    Fast,
    /// Process crashed, exited nonzero or could not be spawned
    Slow,
}

/// The two configured backoff delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffLevels {
    pub fast: Duration,
    pub slow: Duration,
}

impl Default for BackoffLevels {
    fn default() -> Self {
        Self {
            fast: Duration::from_millis(FAST_RELOAD_MS),
            slow: Duration::from_millis(SLOW_RELOAD_MS),
        }
    }
}

impl BackoffLevels {
    pub fn from_millis(fast_ms: u64, slow_ms: u64) -> Self {
        Self {
            fast: Duration::from_millis(fast_ms),
            slow: Duration::from_millis(slow_ms),
        }
    }

    /// Delay for the given backoff level
    pub fn delay(&self, backoff: Backoff) -> Duration {
        match backoff {
            Backoff::Fast => self.fast,
            Backoff::Slow => self.slow,
        }
    }
}

/// Display server the host shell runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayServer {
    /// Windows carry native ownership information; no emulation needed
    X11,
    /// Window ownership must be queried through the compositor or emulated
    Wayland,
}

impl DisplayServer {
    /// Detect the display server from the session environment.
    pub fn detect() -> Self {
        let session_type = std::env::var("XDG_SESSION_TYPE").ok();
        let wayland_display = std::env::var_os("WAYLAND_DISPLAY");
        Self::from_env(session_type.as_deref(), wayland_display.is_some())
    }

    fn from_env(session_type: Option<&str>, has_wayland_display: bool) -> Self {
        match session_type {
            Some(t) if t.eq_ignore_ascii_case("wayland") => DisplayServer::Wayland,
            Some(t) if t.eq_ignore_ascii_case("x11") => DisplayServer::X11,
            _ if has_wayland_display => DisplayServer::Wayland,
            _ => DisplayServer::X11,
        }
    }

    pub fn is_wayland(&self) -> bool {
        matches!(self, DisplayServer::Wayland)
    }
}

impl fmt::Display for DisplayServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayServer::X11 => write!(f, "x11"),
            DisplayServer::Wayland => write!(f, "wayland"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_levels_default() {
        let levels = BackoffLevels::default();
        assert_eq!(levels.delay(Backoff::Fast), Duration::from_millis(100));
        assert_eq!(levels.delay(Backoff::Slow), Duration::from_millis(1000));
        assert_eq!(levels.slow, levels.fast * 10);
    }

    #[test]
    fn test_backoff_default_is_fast() {
        assert_eq!(Backoff::default(), Backoff::Fast);
    }

    #[test]
    fn test_display_server_from_session_type() {
        assert_eq!(
            DisplayServer::from_env(Some("wayland"), false),
            DisplayServer::Wayland
        );
        assert_eq!(
            DisplayServer::from_env(Some("x11"), true),
            DisplayServer::X11
        );
    }

    #[test]
    fn test_display_server_falls_back_to_wayland_display() {
        assert_eq!(DisplayServer::from_env(None, true), DisplayServer::Wayland);
        assert_eq!(DisplayServer::from_env(Some("tty"), true), DisplayServer::Wayland);
        assert_eq!(DisplayServer::from_env(None, false), DisplayServer::X11);
    }

    #[test]
    #[serial_test::serial]
    fn test_detect_reads_session_environment() {
        let saved_type = std::env::var_os("XDG_SESSION_TYPE");
        let saved_display = std::env::var_os("WAYLAND_DISPLAY");

        std::env::set_var("XDG_SESSION_TYPE", "wayland");
        std::env::remove_var("WAYLAND_DISPLAY");
        assert_eq!(DisplayServer::detect(), DisplayServer::Wayland);

        std::env::set_var("XDG_SESSION_TYPE", "x11");
        std::env::set_var("WAYLAND_DISPLAY", "wayland-0");
        assert_eq!(DisplayServer::detect(), DisplayServer::X11);

        std::env::remove_var("XDG_SESSION_TYPE");
        assert_eq!(DisplayServer::detect(), DisplayServer::Wayland);

        match saved_type {
            Some(v) => std::env::set_var("XDG_SESSION_TYPE", v),
            None => std::env::remove_var("XDG_SESSION_TYPE"),
        }
        match saved_display {
            Some(v) => std::env::set_var("WAYLAND_DISPLAY", v),
            None => std::env::remove_var("WAYLAND_DISPLAY"),
        }
    }

    #[test]
    fn test_window_ref_builder() {
        let window = WindowRef::new(7).with_pid(1234).with_title("wallpaper");
        assert_eq!(window.id, 7);
        assert_eq!(window.pid, Some(1234));
        assert_eq!(window.title.as_deref(), Some("wallpaper"));
    }

    #[test]
    fn test_process_id_display() {
        assert_eq!(ProcessId(3).to_string(), "#3");
    }
}
