//! Window ownership bridge
//!
//! Keeps the shell's view of "which renderer is current" in step with the
//! supervisor. Queries made through a [`WindowOwnershipView`] always go to the
//! handle bound most recently, and to nothing while no renderer is active.

use std::sync::{Arc, PoisonError, RwLock};

use livewall_core::prelude::*;
use livewall_core::WindowRef;
use livewall_daemon::{ProcessHandle, ProcessWindows};

use crate::collaborators::WindowEmulation;

/// Cloneable read side of the bridge, handed to the shell.
#[derive(Debug, Clone, Default)]
pub struct WindowOwnershipView {
    active: Arc<RwLock<Option<Arc<ProcessWindows>>>>,
}

impl WindowOwnershipView {
    fn active(&self) -> Option<Arc<ProcessWindows>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, windows: Option<Arc<ProcessWindows>>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = windows;
    }

    /// Does `window` belong to the current renderer? `false` when none is bound.
    pub fn query_window_belongs_to(&self, window: &WindowRef) -> bool {
        self.active()
            .is_some_and(|w| w.query_window_belongs_to(window))
    }

    pub fn show_in_window_list(&self, window: &WindowRef) {
        if let Some(w) = self.active() {
            w.show_in_window_list(window);
        }
    }

    pub fn hide_from_window_list(&self, window: &WindowRef) {
        if let Some(w) = self.active() {
            w.hide_from_window_list(window);
        }
    }

    /// Pid of the bound renderer
    pub fn active_pid(&self) -> Option<u32> {
        self.active().and_then(|w| w.pid())
    }

    pub fn is_bound(&self) -> bool {
        self.active().is_some()
    }
}

/// Write side of the bridge, owned by the supervisor.
pub struct WindowOwnershipBridge {
    view: WindowOwnershipView,
    emulation: Box<dyn WindowEmulation>,
    emulation_enabled: bool,
}

impl WindowOwnershipBridge {
    pub fn new(emulation: Box<dyn WindowEmulation>) -> Self {
        Self {
            view: WindowOwnershipView::default(),
            emulation,
            emulation_enabled: false,
        }
    }

    /// Re-point ownership queries at `handle`, or at nothing.
    pub fn bind(&mut self, handle: Option<&ProcessHandle>) {
        let windows = handle.map(ProcessHandle::windows);
        match handle {
            Some(h) => debug!("Window ownership bound to {} {}", h.label(), h.id()),
            None => debug!("Window ownership unbound"),
        }
        self.view.set(windows.clone());
        self.emulation.set_active_process(windows);
    }

    pub fn view(&self) -> WindowOwnershipView {
        self.view.clone()
    }

    pub fn query_window_belongs_to(&self, window: &WindowRef) -> bool {
        self.view.query_window_belongs_to(window)
    }

    pub fn show_in_window_list(&self, window: &WindowRef) {
        self.view.show_in_window_list(window)
    }

    pub fn hide_from_window_list(&self, window: &WindowRef) {
        self.view.hide_from_window_list(window)
    }

    pub fn enable_emulation(&mut self) {
        if !self.emulation_enabled {
            self.emulation_enabled = true;
            self.emulation.enable();
        }
    }

    pub fn disable_emulation(&mut self) {
        if self.emulation_enabled {
            self.emulation_enabled = false;
            self.emulation.disable();
        }
    }

    pub fn emulation_enabled(&self) -> bool {
        self.emulation_enabled
    }
}
