//! Host-side collaborators driven by the supervisor
//!
//! The desktop shell owns the window-manager override layer and the
//! ownership emulation module. The supervisor only switches them on and off
//! and tells the emulation module which renderer is current.

use std::sync::Arc;

use livewall_core::prelude::*;
use livewall_daemon::ProcessWindows;

/// Window-manager override layer
#[cfg_attr(test, mockall::automock)]
pub trait ShellOverride: Send {
    fn enable(&mut self);
    fn disable(&mut self);
}

/// Window ownership emulation module
#[cfg_attr(test, mockall::automock)]
pub trait WindowEmulation: Send {
    fn enable(&mut self);
    fn disable(&mut self);

    /// Point the module at the current renderer, or at nothing.
    fn set_active_process(&mut self, process: Option<Arc<ProcessWindows>>);
}

/// Used when no shell integration is loaded.
#[derive(Debug, Default)]
pub struct NoShellOverride;

impl ShellOverride for NoShellOverride {
    fn enable(&mut self) {
        debug!("No window-manager override to enable");
    }

    fn disable(&mut self) {
        debug!("No window-manager override to disable");
    }
}

/// Used when no shell integration is loaded.
#[derive(Debug, Default)]
pub struct NoWindowEmulation;

impl WindowEmulation for NoWindowEmulation {
    fn enable(&mut self) {
        debug!("No window emulation module to enable");
    }

    fn disable(&mut self) {
        debug!("No window emulation module to disable");
    }

    fn set_active_process(&mut self, process: Option<Arc<ProcessWindows>>) {
        trace!(
            "Active renderer for window emulation: {:?}",
            process.and_then(|p| p.pid())
        );
    }
}
