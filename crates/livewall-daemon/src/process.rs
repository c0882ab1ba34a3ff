//! Renderer process management

use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::unix::pipe;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use livewall_core::prelude::*;
use livewall_core::{ExitOutcome, LogSink, ProcessEvent, ProcessId, WindowRef};

use crate::ownership::{OwnershipQuery, ProcessWindows};
use crate::relay::OutputRelay;
use crate::signal::send_terminate;

/// Owns one renderer child process.
///
/// The `Child` is moved into a dedicated `wait_for_exit` background task which
/// emits exactly one [`ProcessEvent::Exited`] carrying this handle's
/// [`ProcessId`]. The handle keeps the cancellation token shared with the
/// output relay and an atomic running flag for synchronous checks. It also
/// holds the window-facing [`ProcessWindows`] that the ownership bridge binds to.
///
/// stdout and stderr share one pipe, so the relay sees both streams in the
/// order the renderer wrote them.
///
/// A handle spawns at most once. Once its process has exited it is only
/// kept around until the supervisor drops it.
pub struct ProcessHandle {
    id: ProcessId,
    /// Label prefixed to every relayed output line
    label: String,
    /// Platform marker passed on the Wayland path
    extra_arg: String,
    /// Halts the output relay and marks teardown as intentional
    cancel: CancellationToken,
    /// Set once the OS confirmed the launch, cleared at exit
    running: Arc<AtomicBool>,
    windows: Arc<ProcessWindows>,
    /// Pid that receives SIGTERM; only set by a real spawn
    signal_target: Option<u32>,
    cwd: Option<PathBuf>,
    spawned: bool,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("pid", &self.pid())
            .field("running", &self.is_running())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("wayland", &self.wants_wayland_binding())
            .finish()
    }
}

impl ProcessHandle {
    /// Create an unspawned handle.
    ///
    /// `ownership` is `Some` only on the Wayland path.
    pub fn new(
        id: ProcessId,
        label: impl Into<String>,
        extra_arg: impl Into<String>,
        ownership: Option<OwnershipQuery>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(false));
        let windows = Arc::new(ProcessWindows::new(Arc::clone(&running), ownership));
        Self {
            id,
            label: label.into(),
            extra_arg: extra_arg.into(),
            cancel: CancellationToken::new(),
            running,
            windows,
            signal_target: None,
            cwd: None,
            spawned: false,
        }
    }

    /// Launch the child process.
    ///
    /// On success the output relay and the exit monitor are running and
    /// `true` is returned. If the OS refuses to create the process, `false` is
    /// returned and the handle stays not-running.
    pub fn spawn(
        &mut self,
        argv: &[String],
        cwd: &Path,
        sink: Arc<dyn LogSink>,
        events: mpsc::Sender<ProcessEvent>,
    ) -> bool {
        if self.spawned {
            warn!("Process {} was already spawned; handles are never reused", self.id);
            return self.is_running();
        }
        self.spawned = true;
        self.cwd = Some(cwd.to_path_buf());

        let Some((program, args)) = argv.split_first() else {
            warn!("Cannot spawn {}: {}", self.label, Error::EmptyArgv);
            return false;
        };

        info!("Spawning {} {}: {}", self.label, self.id, argv.join(" "));

        let (output_rx, output_tx) = match output_pipe() {
            Ok(ends) => ends,
            Err(e) => {
                warn!("Cannot create output pipe for {} {}: {}", self.label, self.id, e);
                return false;
            }
        };
        let stderr_tx = match output_tx.try_clone() {
            Ok(fd) => fd,
            Err(e) => {
                warn!("Cannot create output pipe for {} {}: {}", self.label, self.id, e);
                return false;
            }
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::from(output_tx))
            .stderr(Stdio::from(stderr_tx))
            .kill_on_drop(true);

        let spawned = command.spawn();
        // Closes our write ends; the relay sees EOF once the child's are gone too
        drop(command);

        let child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let err = if e.kind() == std::io::ErrorKind::NotFound {
                    Error::renderer_not_found(program)
                } else {
                    Error::process_spawn(e.to_string())
                };
                warn!("Failed to spawn {} {}: {}", self.label, self.id, err);
                return false;
            }
        };

        let pid = child.id();
        self.signal_target = pid;
        self.windows.set_pid(pid);
        info!("{} {} started with PID: {:?}", self.label, self.id, pid);

        match pipe::Receiver::from_owned_fd(output_rx) {
            Ok(output) => {
                OutputRelay::new(&self.label, sink, self.cancel.clone()).spawn(output);
            }
            Err(e) => warn!("{} {} output will not be relayed: {}", self.label, self.id, e),
        }

        // Must be set before the wait task can possibly clear it.
        self.running.store(true, Ordering::Release);

        tokio::spawn(Self::wait_for_exit(
            child,
            self.id,
            Arc::clone(&self.running),
            events,
        ));

        true
    }

    /// Background task: owns `child`, waits for it to exit, emits `ProcessEvent::Exited`.
    async fn wait_for_exit(
        mut child: Child,
        id: ProcessId,
        running: Arc<AtomicBool>,
        events: mpsc::Sender<ProcessEvent>,
    ) {
        let outcome = match child.wait().await {
            Ok(status) => {
                info!("Renderer {} exited with status: {:?}", id, status);
                ExitOutcome::from(status)
            }
            Err(e) => {
                error!("Error waiting for renderer {}: {}", id, e);
                ExitOutcome::Unknown
            }
        };

        running.store(false, Ordering::Release);

        debug!("Sending ProcessEvent::Exited {{ id: {}, outcome: {} }}", id, outcome);
        if events
            .send(ProcessEvent::Exited { id, outcome })
            .await
            .is_err()
        {
            debug!("Exit channel closed before renderer {} exit was delivered", id);
        }
    }

    /// Request termination: cancel the token and send SIGTERM.
    ///
    /// Does not wait for the process to exit; the exit monitor reports it.
    pub fn terminate(&self) {
        self.cancel.cancel();
        if !self.is_running() {
            return;
        }
        if let Some(pid) = self.signal_target {
            info!("Sending SIGTERM to {} {} (PID {})", self.label, self.id, pid);
            if let Err(e) = send_terminate(pid) {
                warn!("Failed to terminate {} {}: {}", self.label, self.id, e);
            }
        }
    }

    /// Record the exit notification. Idempotent.
    pub fn mark_exited(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn extra_arg(&self) -> &str {
        &self.extra_arg
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn pid(&self) -> Option<u32> {
        self.windows.pid()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether `terminate()` (or drop) has cancelled this handle
    pub fn termination_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn wants_wayland_binding(&self) -> bool {
        self.windows.wants_wayland_binding()
    }

    /// Window-facing half of this process, shared with the ownership bridge
    pub fn windows(&self) -> Arc<ProcessWindows> {
        Arc::clone(&self.windows)
    }

    pub fn query_window_belongs_to(&self, window: &WindowRef) -> bool {
        self.windows.query_window_belongs_to(window)
    }

    pub fn show_in_window_list(&self, window: &WindowRef) {
        self.windows.show_in_window_list(window)
    }

    pub fn hide_from_window_list(&self, window: &WindowRef) {
        self.windows.hide_from_window_list(window)
    }

    /// A handle that behaves as if the OS had confirmed the launch.
    ///
    /// `pid` is only reported for window correlation; no signal is ever sent.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn launched_for_test(
        id: ProcessId,
        label: impl Into<String>,
        ownership: Option<OwnershipQuery>,
        pid: Option<u32>,
    ) -> Self {
        let mut handle = Self::new(id, label, "", ownership);
        handle.spawned = true;
        handle.windows.set_pid(pid);
        handle.running.store(true, Ordering::Release);
        handle
    }

    /// A handle whose launch the OS refused.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn failed_for_test(id: ProcessId, label: impl Into<String>) -> Self {
        let mut handle = Self::new(id, label, "", None);
        handle.spawned = true;
        handle
    }
}

/// Anonymous pipe shared by the child's stdout and stderr: `(read, write)`.
fn output_pipe() -> std::io::Result<(OwnedFd, OwnedFd)> {
    // Close-on-exec keeps later renderers from inheriting an earlier pipe
    #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
    let ends = nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)?;
    #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
    let ends = nix::unistd::pipe()?;
    Ok(ends)
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("{} {} dropped while process may still be running", self.label, self.id);
        }
        // Stops the relay; kill_on_drop on the Child is the final safety net.
        self.cancel.cancel();
        trace!("{} {} dropped", self.label, self.id);
    }
}
