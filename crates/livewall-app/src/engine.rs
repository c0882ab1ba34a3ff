//! Engine - the supervisor control loop
//!
//! The Engine owns the message channel, the process event channel, the
//! supervisor and the config watcher. Every state change happens inside
//! [`Engine::run`], one event at a time.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use livewall_core::prelude::*;
use livewall_core::{DisplayServer, LogSink, ProcessEvent, TracingSink};
use livewall_daemon::{StaleInstanceReaper, WindowClient, WindowListFilter};

use crate::bridge::WindowOwnershipView;
use crate::collaborators::{NoShellOverride, NoWindowEmulation, ShellOverride, WindowEmulation};
use crate::config::{try_load_settings, Settings, SettingsOverrides};
use crate::message::Message;
use crate::spawn::OsSpawner;
use crate::supervisor::{RendererSupervisor, SupervisorConfig, SupervisorStatus};
use crate::timer::TokioRestartTimer;
use crate::watcher::ConfigWatcher;

/// How long `Quit` waits for the renderer to report its exit
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

const MESSAGE_CHANNEL_SIZE: usize = 64;
const PROCESS_CHANNEL_SIZE: usize = 16;

/// What the host environment provides to the engine
pub struct HostBindings {
    /// Destination for renderer output
    pub sink: Arc<dyn LogSink>,
    pub display: DisplayServer,
    /// Compositor client for native ownership queries, if the host has one
    pub native_client: Option<Arc<dyn WindowClient>>,
    /// Window-list visibility table for the emulated path
    pub filter: WindowListFilter,
    pub shell_override: Box<dyn ShellOverride>,
    pub emulation: Box<dyn WindowEmulation>,
    /// Terminate renderers left over from an earlier supervisor
    pub reap_stale: bool,
}

impl Default for HostBindings {
    fn default() -> Self {
        Self {
            sink: Arc::new(TracingSink),
            display: DisplayServer::detect(),
            native_client: None,
            filter: WindowListFilter::new(),
            shell_override: Box::new(NoShellOverride),
            emulation: Box::new(NoWindowEmulation),
            reap_stale: true,
        }
    }
}

pub struct Engine {
    supervisor: RendererSupervisor<OsSpawner, TokioRestartTimer>,

    /// Sender half of the message channel.
    /// Clone this to give to input sources (signal handler, watcher).
    msg_tx: mpsc::Sender<Message>,
    msg_rx: mpsc::Receiver<Message>,

    /// Exit notifications from renderer processes
    process_rx: mpsc::Receiver<ProcessEvent>,

    /// Loaded settings, with overrides applied
    settings: Settings,
    overrides: SettingsOverrides,
    config_path: Option<PathBuf>,

    display: DisplayServer,
    native_client: Option<Arc<dyn WindowClient>>,
    filter: WindowListFilter,

    /// None if watching is disabled or failed to start
    config_watcher: Option<ConfigWatcher>,
}

impl Engine {
    /// Create an engine. `settings` must already have `overrides` applied.
    pub fn new(
        settings: Settings,
        overrides: SettingsOverrides,
        config_path: Option<PathBuf>,
        host: HostBindings,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(MESSAGE_CHANNEL_SIZE);
        let (process_tx, process_rx) = mpsc::channel(PROCESS_CHANNEL_SIZE);

        let config = SupervisorConfig::from_settings(
            &settings,
            host.display,
            host.native_client.clone(),
            host.filter.clone(),
        );
        info!(
            "Display server: {}, ownership: {:?}",
            host.display, config.ownership
        );

        let reaper = host
            .reap_stale
            .then(|| StaleInstanceReaper::with_procfs(config.launch.signature()));

        let supervisor = RendererSupervisor::new(
            config,
            OsSpawner::new(host.sink, process_tx),
            TokioRestartTimer::new(msg_tx.clone()),
            host.shell_override,
            host.emulation,
            reaper,
        );

        Self {
            supervisor,
            msg_tx,
            msg_rx,
            process_rx,
            settings,
            overrides,
            config_path,
            display: host.display,
            native_client: host.native_client,
            filter: host.filter,
            config_watcher: None,
        }
    }

    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    pub fn ownership_view(&self) -> WindowOwnershipView {
        self.supervisor.ownership_view()
    }

    pub fn status(&self) -> SupervisorStatus {
        self.supervisor.status()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Enable the supervisor and process events until `Quit`.
    pub async fn run(mut self) -> Result<()> {
        self.start_config_watcher();
        self.supervisor.enable();

        loop {
            tokio::select! {
                Some(msg) = self.msg_rx.recv() => {
                    if self.handle_message(msg).is_break() {
                        break;
                    }
                }
                Some(event) = self.process_rx.recv() => {
                    self.supervisor.handle_process_event(event);
                }
                else => break,
            }
        }

        self.shutdown().await;
        Ok(())
    }

    fn handle_message(&mut self, msg: Message) -> ControlFlow<()> {
        match msg {
            Message::Enable => self.supervisor.enable(),
            Message::Disable => self.supervisor.disable(),
            Message::KillCurrentProcess => self.supervisor.kill_current_process(),
            Message::RestartTimerFired { timer } => self.supervisor.handle_timer_fired(timer),
            Message::ReloadSettings => self.reload_settings(),
            Message::WatcherError { message } => {
                warn!("Config watcher: {}", message);
            }
            Message::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Re-read the settings file, reconfigure and relaunch the renderer.
    fn reload_settings(&mut self) {
        if let Some(path) = &self.config_path {
            match try_load_settings(path) {
                Ok(mut settings) => {
                    self.overrides.apply(&mut settings);
                    if settings.watch != self.settings.watch {
                        debug!("Watch settings take effect on next start");
                    }
                    self.settings = settings;
                    self.supervisor.reconfigure(SupervisorConfig::from_settings(
                        &self.settings,
                        self.display,
                        self.native_client.clone(),
                        self.filter.clone(),
                    ));
                    info!("Settings reloaded from {}", path.display());
                }
                Err(e) => {
                    warn!("Keeping current settings: {}", e);
                }
            }
        }
        self.supervisor.kill_current_process();
    }

    fn start_config_watcher(&mut self) {
        if !self.settings.watch.enabled {
            return;
        }
        let Some(path) = &self.config_path else {
            return;
        };

        let mut watcher = ConfigWatcher::new(
            path.clone(),
            Duration::from_millis(self.settings.watch.debounce_ms),
        );
        match watcher.start(self.msg_tx.clone()) {
            Ok(()) => self.config_watcher = Some(watcher),
            Err(e) => warn!("Config watcher not started: {}", e),
        }
    }

    /// Disable the supervisor and wait, bounded, for the renderer to exit.
    async fn shutdown(&mut self) {
        info!("Shutting down");
        if let Some(mut watcher) = self.config_watcher.take() {
            watcher.stop();
        }
        self.supervisor.disable();

        let deadline = tokio::time::sleep(SHUTDOWN_TIMEOUT);
        tokio::pin!(deadline);

        while self.supervisor.has_live_process() {
            tokio::select! {
                event = self.process_rx.recv() => match event {
                    Some(event) => self.supervisor.handle_process_event(event),
                    None => break,
                },
                _ = &mut deadline => {
                    warn!("Renderer did not exit within {:?}", SHUTDOWN_TIMEOUT);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::Phase;
    use livewall_core::CaptureSink;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn write_renderer(dir: &Path, script: &str) {
        let entry = dir.join("renderer.js");
        std::fs::write(&entry, format!("#!/bin/sh\n{}\n", script)).unwrap();
        std::fs::set_permissions(&entry, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn settings_for(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.renderer.install_path = dir.to_path_buf();
        settings.renderer.working_dir = Some(dir.to_path_buf());
        settings.restart.fast_ms = 10;
        settings.restart.slow_ms = 20;
        settings.watch.enabled = false;
        settings
    }

    fn host(sink: Arc<CaptureSink>) -> HostBindings {
        HostBindings {
            sink,
            display: DisplayServer::X11,
            reap_stale: false,
            ..HostBindings::default()
        }
    }

    #[tokio::test]
    async fn test_quit_stops_renderer() {
        let dir = tempfile::tempdir().unwrap();
        write_renderer(dir.path(), "echo started\nexec sleep 60");
        let sink = Arc::new(CaptureSink::new());

        let engine = Engine::new(
            settings_for(dir.path()),
            SettingsOverrides::default(),
            None,
            host(sink.clone()),
        );
        let tx = engine.msg_sender();
        let run = tokio::spawn(engine.run());

        tokio::time::sleep(Duration::from_millis(300)).await;
        tx.send(Message::Quit).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("engine should stop")
            .unwrap()
            .unwrap();
        assert!(sink.lines().contains(&"started".to_string()));
    }

    #[tokio::test]
    async fn test_reload_without_config_file_relaunches() {
        let dir = tempfile::tempdir().unwrap();
        write_renderer(dir.path(), "echo up\nexec sleep 60");
        let sink = Arc::new(CaptureSink::new());

        let mut engine = Engine::new(
            settings_for(dir.path()),
            SettingsOverrides::default(),
            None,
            host(sink.clone()),
        );
        engine.supervisor.enable();
        let first = engine.status().process_id;
        assert!(first.is_some());

        assert!(engine.handle_message(Message::ReloadSettings).is_continue());
        assert!(engine
            .supervisor
            .current()
            .unwrap()
            .termination_requested());

        // Drive the loop by hand until the replacement is running
        for _ in 0..50 {
            tokio::select! {
                Some(event) = engine.process_rx.recv() => engine.supervisor.handle_process_event(event),
                Some(msg) = engine.msg_rx.recv() => { let _ = engine.handle_message(msg); }
            }
            if engine.status().phase == Phase::Running && engine.status().process_id != first {
                break;
            }
        }
        assert_eq!(engine.status().phase, Phase::Running);
        assert_ne!(engine.status().process_id, first);

        engine.shutdown().await;
        assert!(!engine.supervisor.has_live_process());
    }

    #[tokio::test]
    async fn test_reload_applies_file_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        write_renderer(dir.path(), "exec sleep 60");
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "[renderer]\ninstall_path = \"/nowhere\"\nlabel = \"Wallpaper\"\n[restart]\nslow_ms = 30\n[watch]\nenabled = false\n",
        )
        .unwrap();
        let overrides = SettingsOverrides {
            install_path: Some(dir.path().to_path_buf()),
            ..SettingsOverrides::default()
        };
        let sink = Arc::new(CaptureSink::new());

        let mut engine = Engine::new(
            settings_for(dir.path()),
            overrides,
            Some(config_path),
            host(sink),
        );
        let _ = engine.handle_message(Message::ReloadSettings);

        assert_eq!(engine.settings().renderer.label, "Wallpaper");
        assert_eq!(engine.settings().renderer.install_path, dir.path());
        assert_eq!(engine.settings().restart.slow_ms, 30);
    }

    #[tokio::test]
    async fn test_invalid_reload_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "[restart\n").unwrap();
        let sink = Arc::new(CaptureSink::new());

        let mut engine = Engine::new(
            settings_for(dir.path()),
            SettingsOverrides::default(),
            Some(config_path),
            host(sink),
        );
        let before = engine.settings().clone();
        let _ = engine.handle_message(Message::ReloadSettings);
        assert_eq!(engine.settings(), &before);
    }

    #[tokio::test]
    async fn test_quit_breaks_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(
            settings_for(dir.path()),
            SettingsOverrides::default(),
            None,
            host(Arc::new(CaptureSink::new())),
        );
        assert!(engine.handle_message(Message::Quit).is_break());
        assert!(engine
            .handle_message(Message::WatcherError {
                message: "boom".to_string()
            })
            .is_continue());
    }
}
