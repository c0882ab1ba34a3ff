//! Renderer supervisor state machine
//!
//! Owns the single renderer slot. Every transition runs on the control loop:
//!
//! ```text
//! Disabled ──enable──▶ Starting ──launch──▶ Running ──exit──▶ RestartScheduled
//!    ▲                    ▲                                        │
//!    │                    └──────────────── timer ─────────────────┘
//!    └──────────── disable (from any state) ───── Stopping ──exit──┘
//! ```
//!
//! Termination is requested, never awaited: the exit notification that
//! follows is the one place that clears the slot and decides on a restart.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};

use livewall_core::prelude::*;
use livewall_core::{
    Backoff, BackoffLevels, DisplayServer, ExitKind, ExitOutcome, ProcessEvent, ProcessId,
    WindowRef,
};
use livewall_daemon::{
    LaunchSpec, OwnershipQuery, ProcessHandle, StaleInstanceReaper, WindowClient,
    WindowListFilter,
};

use crate::bridge::{WindowOwnershipBridge, WindowOwnershipView};
use crate::collaborators::{ShellOverride, WindowEmulation};
use crate::config::Settings;
use crate::spawn::{SpawnRequest, Spawner};
use crate::timer::{RestartTimer, TimerId};

/// What the supervisor launches and how it backs off
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub launch: LaunchSpec,
    pub label: String,
    pub display: DisplayServer,
    pub backoff: BackoffLevels,
    /// Ownership capability attached to every new handle
    pub ownership: Option<OwnershipQuery>,
}

impl SupervisorConfig {
    pub fn from_settings(
        settings: &Settings,
        display: DisplayServer,
        native: Option<Arc<dyn WindowClient>>,
        filter: WindowListFilter,
    ) -> Self {
        Self {
            launch: settings.launch_spec(),
            label: settings.renderer.label.clone(),
            display,
            backoff: settings.backoff_levels(),
            ownership: settings.windowing.ownership.resolve(display, native, filter),
        }
    }

    fn extra_arg(&self) -> String {
        if self.display.is_wayland() {
            self.launch.platform_marker.clone()
        } else {
            String::new()
        }
    }

    fn emulated(&self) -> bool {
        matches!(self.ownership, Some(OwnershipQuery::Emulated(_)))
    }
}

/// Coarse supervisor state, derived from the slot contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disabled,
    /// Enabled, nothing running and no restart armed
    Starting,
    Running,
    RestartScheduled,
    /// Disabled, but the last renderer has not reported its exit yet
    Stopping,
}

/// Point-in-time view for logging and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorStatus {
    pub phase: Phase,
    pub process_id: Option<ProcessId>,
    pub pid: Option<u32>,
    pub started_at: Option<DateTime<Local>>,
    pub backoff: Backoff,
    pub pending_delay: Option<Duration>,
    /// Launch attempts, successful or not
    pub launches: u64,
    /// Restarts scheduled after an exit or failed launch
    pub restarts: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRestart {
    timer: TimerId,
    delay: Duration,
}

/// The active renderer and when it started
struct Slot {
    handle: ProcessHandle,
    started_at: DateTime<Local>,
}

pub struct RendererSupervisor<S: Spawner, T: RestartTimer> {
    config: SupervisorConfig,
    spawner: S,
    timer: T,
    shell: Box<dyn ShellOverride>,
    bridge: WindowOwnershipBridge,
    /// Taken by the first `enable()`
    reaper: Option<StaleInstanceReaper>,

    enabled: bool,
    current: Option<Slot>,
    pending: Option<PendingRestart>,
    backoff: Backoff,

    next_process_id: u64,
    next_timer_id: u64,
    launches: u64,
    restarts: u64,
}

impl<S: Spawner, T: RestartTimer> RendererSupervisor<S, T> {
    pub fn new(
        config: SupervisorConfig,
        spawner: S,
        timer: T,
        shell: Box<dyn ShellOverride>,
        emulation: Box<dyn WindowEmulation>,
        reaper: Option<StaleInstanceReaper>,
    ) -> Self {
        Self {
            config,
            spawner,
            timer,
            shell,
            bridge: WindowOwnershipBridge::new(emulation),
            reaper,
            enabled: false,
            current: None,
            pending: None,
            backoff: Backoff::Fast,
            next_process_id: 1,
            next_timer_id: 1,
            launches: 0,
            restarts: 0,
        }
    }

    // ─────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────

    /// Start supervising and launch the renderer now.
    ///
    /// A pending restart is cancelled and replaced by an immediate launch at
    /// fast backoff. No-op while enabled with a renderer already active.
    pub fn enable(&mut self) {
        let was_enabled = self.enabled;
        if was_enabled && self.current.is_some() {
            debug!("Supervisor already enabled");
            return;
        }
        info!("Enabling renderer supervisor");
        self.enabled = true;
        self.cancel_pending();
        self.backoff = Backoff::Fast;

        if !was_enabled {
            self.shell.enable();
            if self.config.emulated() {
                self.bridge.enable_emulation();
            }
        }

        if let Some(reaper) = self.reaper.take() {
            let reaped = reaper.reap();
            if reaped > 0 {
                info!("Terminated {} stale renderer instance(s)", reaped);
            }
        }

        if let Some(slot) = &self.current {
            // Disabled and re-enabled before the old renderer exited.
            // Its exit notification schedules the next launch.
            info!(
                "Waiting for {} {} to exit before relaunching",
                slot.handle.label(),
                slot.handle.id()
            );
            return;
        }
        self.spawn();
    }

    /// Stop the renderer and never restart it. No-op while already disabled.
    pub fn disable(&mut self) {
        if !self.enabled {
            debug!("Supervisor already disabled");
            return;
        }
        info!("Disabling renderer supervisor");
        self.enabled = false;
        self.cancel_pending();

        if let Some(slot) = &self.current {
            slot.handle.terminate();
        }

        self.shell.disable();
        self.bridge.disable_emulation();
    }

    /// Terminate the renderer so that it is relaunched.
    ///
    /// A pending restart is replaced by one at the fast delay. A running
    /// renderer is terminated; its exit notification drives the relaunch.
    pub fn kill_current_process(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.timer.cancel(pending.timer);
            if self.enabled {
                debug!("Replacing {:?} restart with a fast one", pending.delay);
                self.backoff = Backoff::Fast;
                self.arm_restart();
            }
        }

        if let Some(slot) = &self.current {
            info!("Killing {} {}", slot.handle.label(), slot.handle.id());
            slot.handle.terminate();
        }
    }

    /// Dispatch a process event from the control loop.
    pub fn handle_process_event(&mut self, event: ProcessEvent) {
        match event {
            ProcessEvent::Exited { id, outcome } => self.handle_exit(id, outcome),
        }
    }

    fn handle_exit(&mut self, id: ProcessId, outcome: ExitOutcome) {
        let is_current = self
            .current
            .as_ref()
            .is_some_and(|slot| slot.handle.id() == id);
        if !is_current {
            debug!("Ignoring exit of superseded renderer {} ({})", id, outcome);
            return;
        }

        let Some(slot) = self.current.take() else {
            return;
        };
        slot.handle.mark_exited();

        match outcome.kind() {
            ExitKind::Clean => {
                info!("{} {} exited cleanly", slot.handle.label(), id);
            }
            ExitKind::Abnormal => {
                warn!("{} {} exited abnormally: {}", slot.handle.label(), id, outcome);
                self.backoff = Backoff::Slow;
            }
        }

        self.bridge.bind(None);
        drop(slot);

        if self.enabled {
            self.schedule_restart();
        }
    }

    /// A restart timer fired. Stale timers are ignored.
    pub fn handle_timer_fired(&mut self, timer: TimerId) {
        match self.pending {
            Some(pending) if pending.timer == timer => {}
            _ => {
                debug!("Ignoring stale {}", timer);
                return;
            }
        }
        self.pending = None;

        if !self.enabled {
            return;
        }
        if let Some(slot) = &self.current {
            warn!(
                "Restart timer fired while {} {} is still active",
                slot.handle.label(),
                slot.handle.id()
            );
            return;
        }
        self.spawn();
    }

    /// Replace the launch configuration.
    ///
    /// Applies to the next launch; call [`kill_current_process`](Self::kill_current_process)
    /// to relaunch now.
    pub fn reconfigure(&mut self, config: SupervisorConfig) {
        let was_emulated = self.config.emulated();
        self.config = config;

        if self.enabled && was_emulated != self.config.emulated() {
            if self.config.emulated() {
                self.bridge.enable_emulation();
            } else {
                self.bridge.disable_emulation();
            }
        }
        debug!("Supervisor reconfigured: {}", self.config.launch.signature());
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub fn query_window_belongs_to(&self, window: &WindowRef) -> bool {
        self.bridge.query_window_belongs_to(window)
    }

    pub fn show_in_window_list(&self, window: &WindowRef) {
        self.bridge.show_in_window_list(window)
    }

    pub fn hide_from_window_list(&self, window: &WindowRef) {
        self.bridge.hide_from_window_list(window)
    }

    /// Cloneable ownership view for the shell
    pub fn ownership_view(&self) -> WindowOwnershipView {
        self.bridge.view()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a renderer exit is still outstanding
    pub fn has_live_process(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&ProcessHandle> {
        self.current.as_ref().map(|slot| &slot.handle)
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        match (self.enabled, &self.current, &self.pending) {
            (false, Some(_), _) => Phase::Stopping,
            (false, None, _) => Phase::Disabled,
            (true, Some(_), _) => Phase::Running,
            (true, None, Some(_)) => Phase::RestartScheduled,
            (true, None, None) => Phase::Starting,
        }
    }

    pub fn status(&self) -> SupervisorStatus {
        SupervisorStatus {
            phase: self.phase(),
            process_id: self.current.as_ref().map(|s| s.handle.id()),
            pid: self.current.as_ref().and_then(|s| s.handle.pid()),
            started_at: self.current.as_ref().map(|s| s.started_at),
            backoff: self.backoff,
            pending_delay: self.pending.map(|p| p.delay),
            launches: self.launches,
            restarts: self.restarts,
        }
    }

    // ─────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────

    fn spawn(&mut self) {
        self.backoff = Backoff::Fast;
        self.launches += 1;

        let id = ProcessId(self.next_process_id);
        self.next_process_id += 1;

        let request = SpawnRequest {
            id,
            label: self.config.label.clone(),
            extra_arg: self.config.extra_arg(),
            argv: self.config.launch.argv(self.config.display),
            cwd: self.config.launch.working_dir().to_path_buf(),
            ownership: self.config.ownership.clone(),
        };

        match self.spawner.spawn(request) {
            Some(handle) => {
                // Bound in the same step the slot is filled
                self.bridge.bind(Some(&handle));
                info!(
                    "{} {} running (PID {:?})",
                    handle.label(),
                    handle.id(),
                    handle.pid()
                );
                self.current = Some(Slot {
                    handle,
                    started_at: Local::now(),
                });
            }
            None => {
                warn!("{} {} failed to launch", self.config.label, id);
                self.backoff = Backoff::Slow;
                self.schedule_restart();
            }
        }
    }

    fn schedule_restart(&mut self) {
        self.restarts += 1;
        self.arm_restart();
    }

    fn arm_restart(&mut self) {
        let delay = self.config.backoff.delay(self.backoff);
        let timer = TimerId(self.next_timer_id);
        self.next_timer_id += 1;

        info!("Restarting {} in {:?}", self.config.label, delay);
        self.timer.arm(timer, delay);
        self.pending = Some(PendingRestart { timer, delay });
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.timer.cancel(pending.timer);
        }
    }
}

impl<S: Spawner, T: RestartTimer> Drop for RendererSupervisor<S, T> {
    fn drop(&mut self) {
        self.cancel_pending();
        if let Some(slot) = &self.current {
            slot.handle.terminate();
        }
    }
}
