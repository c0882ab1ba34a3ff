//! Window ownership capability
//!
//! On X11 the window manager already knows which client owns a window, so no
//! ownership capability is installed and every query answers `false`. On
//! Wayland the capability is selected once at startup:
//!
//! - [`OwnershipQuery::Native`] delegates to a compositor-provided
//!   [`WindowClient`] that can answer "does this window belong to my client".
//! - [`OwnershipQuery::Emulated`] correlates windows by client pid and keeps
//!   its own window-list visibility table.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use livewall_core::prelude::*;
use livewall_core::{DisplayServer, WindowRef};

/// Compositor-side handle for the renderer's client connection.
#[cfg_attr(test, mockall::automock)]
pub trait WindowClient: Send + Sync {
    /// Whether `window` was created by the renderer's client
    fn owns_window(&self, window: &WindowRef) -> Result<bool>;

    fn show_in_window_list(&self, window: &WindowRef) -> Result<()>;

    fn hide_from_window_list(&self, window: &WindowRef) -> Result<()>;
}

/// Window-list visibility table for the emulated path.
///
/// Shared with the shell so its window list can skip hidden renderer windows.
#[derive(Debug, Clone, Default)]
pub struct WindowListFilter {
    hidden: Arc<Mutex<HashSet<u64>>>,
}

impl WindowListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide(&self, window: &WindowRef) {
        self.hidden
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(window.id);
    }

    pub fn show(&self, window: &WindowRef) {
        self.hidden
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&window.id);
    }

    pub fn is_hidden(&self, window: &WindowRef) -> bool {
        self.hidden
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&window.id)
    }
}

/// Ownership capability attached to a renderer process on Wayland.
#[derive(Clone)]
pub enum OwnershipQuery {
    Native(Arc<dyn WindowClient>),
    Emulated(WindowListFilter),
}

impl std::fmt::Debug for OwnershipQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnershipQuery::Native(_) => f.write_str("OwnershipQuery::Native"),
            OwnershipQuery::Emulated(_) => f.write_str("OwnershipQuery::Emulated"),
        }
    }
}

impl OwnershipQuery {
    /// Pick the capability for this session.
    ///
    /// X11 needs none. On Wayland a native client wins when the host provides
    /// one; otherwise ownership is emulated.
    pub fn select(
        display: DisplayServer,
        native: Option<Arc<dyn WindowClient>>,
        filter: WindowListFilter,
    ) -> Option<Self> {
        if !display.is_wayland() {
            return None;
        }
        Some(match native {
            Some(client) => OwnershipQuery::Native(client),
            None => OwnershipQuery::Emulated(filter),
        })
    }

    fn owns(&self, window: &WindowRef, pid: Option<u32>) -> Result<bool> {
        match self {
            OwnershipQuery::Native(client) => client.owns_window(window),
            OwnershipQuery::Emulated(_) => Ok(pid.is_some() && window.pid == pid),
        }
    }

    fn show(&self, window: &WindowRef) -> Result<()> {
        match self {
            OwnershipQuery::Native(client) => client.show_in_window_list(window),
            OwnershipQuery::Emulated(filter) => {
                filter.show(window);
                Ok(())
            }
        }
    }

    fn hide(&self, window: &WindowRef) -> Result<()> {
        match self {
            OwnershipQuery::Native(client) => client.hide_from_window_list(window),
            OwnershipQuery::Emulated(filter) => {
                filter.hide(window);
                Ok(())
            }
        }
    }
}

/// The window-facing half of a renderer process.
///
/// Shared between the [`ProcessHandle`](crate::ProcessHandle) that owns the
/// child and whoever holds the current window binding. All queries are
/// infallible: failures collapse to `false` / no-op.
#[derive(Debug)]
pub struct ProcessWindows {
    running: Arc<AtomicBool>,
    pid: AtomicU32,
    ownership: Option<OwnershipQuery>,
}

impl ProcessWindows {
    pub(crate) fn new(running: Arc<AtomicBool>, ownership: Option<OwnershipQuery>) -> Self {
        Self {
            running,
            pid: AtomicU32::new(0),
            ownership,
        }
    }

    pub(crate) fn set_pid(&self, pid: Option<u32>) {
        self.pid.store(pid.unwrap_or(0), Ordering::Release);
    }

    pub fn pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::Acquire) {
            0 => None,
            pid => Some(pid),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether an ownership capability is installed (Wayland path)
    pub fn wants_wayland_binding(&self) -> bool {
        self.ownership.is_some()
    }

    /// Does `window` belong to this renderer process?
    pub fn query_window_belongs_to(&self, window: &WindowRef) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(ownership) = &self.ownership else {
            return false;
        };
        ownership.owns(window, self.pid()).unwrap_or_else(|e| {
            debug!("Ownership query for window {} failed: {}", window.id, e);
            false
        })
    }

    pub fn show_in_window_list(&self, window: &WindowRef) {
        if !self.is_running() {
            return;
        }
        if let Some(ownership) = &self.ownership {
            if let Err(e) = ownership.show(window) {
                debug!("Failed to show window {} in window list: {}", window.id, e);
            }
        }
    }

    pub fn hide_from_window_list(&self, window: &WindowRef) {
        if !self.is_running() {
            return;
        }
        if let Some(ownership) = &self.ownership {
            if let Err(e) = ownership.hide(window) {
                debug!("Failed to hide window {} from window list: {}", window.id, e);
            }
        }
    }
}
