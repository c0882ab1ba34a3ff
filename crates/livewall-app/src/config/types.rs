//! Configuration types for livewall
//!
//! Defines:
//! - `Settings` - Top-level settings file
//! - `RendererSettings`, `RestartSettings`, `WindowingSettings`, `WatchSettings`
//! - `OwnershipMode` - How window ownership is answered on Wayland

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use livewall_core::prelude::*;
use livewall_core::{BackoffLevels, DisplayServer, FAST_RELOAD_MS, SLOW_RELOAD_MS};
use livewall_daemon::{
    LaunchSpec, OwnershipQuery, WindowClient, WindowListFilter, DEFAULT_INTERPRETER,
    DEFAULT_PLATFORM_MARKER,
};

/// Global settings (from config.toml)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub renderer: RendererSettings,

    #[serde(default)]
    pub restart: RestartSettings,

    #[serde(default)]
    pub windowing: WindowingSettings,

    #[serde(default)]
    pub watch: WatchSettings,
}

impl Settings {
    /// Launch description for the configured renderer
    pub fn launch_spec(&self) -> LaunchSpec {
        let r = &self.renderer;
        let mut spec = LaunchSpec::new(&r.install_path)
            .with_interpreter(&r.interpreter)
            .with_platform_marker(&r.wayland_marker);
        if let Some(entry) = &r.entry {
            spec = spec.with_entry(entry);
        }
        if let Some(dir) = &r.working_dir {
            spec = spec.with_working_dir(dir);
        }
        spec
    }

    pub fn backoff_levels(&self) -> BackoffLevels {
        BackoffLevels::from_millis(self.restart.fast_ms, self.restart.slow_ms)
    }
}

/// Command-line values that win over the settings file, on every reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub install_path: Option<PathBuf>,
    pub entry: Option<PathBuf>,
    pub ownership: Option<OwnershipMode>,
}

impl SettingsOverrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.install_path {
            settings.renderer.install_path = path.clone();
        }
        if let Some(entry) = &self.entry {
            settings.renderer.entry = Some(entry.clone());
        }
        if let Some(mode) = self.ownership {
            settings.windowing.ownership = mode;
        }
    }
}

/// Renderer settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RendererSettings {
    /// Renderer install directory, passed to the renderer via `-P`
    #[serde(default = "default_install_path")]
    pub install_path: PathBuf,

    /// Renderer entry point (defaults to `<install_path>/renderer.js`)
    #[serde(default)]
    pub entry: Option<PathBuf>,

    /// Interpreter the entry point runs under; used to recognise stale instances
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Label prefixed to renderer output
    #[serde(default = "default_label")]
    pub label: String,

    /// Startup marker appended on Wayland
    #[serde(default = "default_wayland_marker")]
    pub wayland_marker: String,

    /// Renderer working directory (defaults to home)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            install_path: default_install_path(),
            entry: None,
            interpreter: default_interpreter(),
            label: default_label(),
            wayland_marker: default_wayland_marker(),
            working_dir: None,
        }
    }
}

fn default_install_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("livewall"))
        .unwrap_or_else(|| PathBuf::from("/usr/share/livewall"))
}

fn default_interpreter() -> String {
    DEFAULT_INTERPRETER.to_string()
}

fn default_label() -> String {
    "Renderer".to_string()
}

fn default_wayland_marker() -> String {
    DEFAULT_PLATFORM_MARKER.to_string()
}

/// Restart delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RestartSettings {
    /// Delay after a clean exit or deliberate kill
    #[serde(default = "default_fast_ms")]
    pub fast_ms: u64,

    /// Delay after a crash or failed launch
    #[serde(default = "default_slow_ms")]
    pub slow_ms: u64,
}

impl Default for RestartSettings {
    fn default() -> Self {
        Self {
            fast_ms: default_fast_ms(),
            slow_ms: default_slow_ms(),
        }
    }
}

fn default_fast_ms() -> u64 {
    FAST_RELOAD_MS
}

fn default_slow_ms() -> u64 {
    SLOW_RELOAD_MS
}

/// Windowing settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WindowingSettings {
    #[serde(default)]
    pub ownership: OwnershipMode,
}

/// How window ownership is determined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipMode {
    /// Native query when available on Wayland, emulation otherwise; nothing on X11
    #[default]
    Auto,
    /// Always ask the compositor client
    Native,
    /// Always correlate by pid
    Emulated,
    /// Never claim ownership of any window
    Off,
}

impl OwnershipMode {
    /// Resolve the capability for this session.
    pub fn resolve(
        self,
        display: DisplayServer,
        native: Option<Arc<dyn WindowClient>>,
        filter: WindowListFilter,
    ) -> Option<OwnershipQuery> {
        match self {
            OwnershipMode::Auto => OwnershipQuery::select(display, native, filter),
            OwnershipMode::Native => match native {
                Some(client) => Some(OwnershipQuery::Native(client)),
                None => {
                    warn!("Native window ownership requested but no compositor client is available; emulating");
                    Some(OwnershipQuery::Emulated(filter))
                }
            },
            OwnershipMode::Emulated => Some(OwnershipQuery::Emulated(filter)),
            OwnershipMode::Off => None,
        }
    }
}

impl std::str::FromStr for OwnershipMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(OwnershipMode::Auto),
            "native" => Ok(OwnershipMode::Native),
            "emulated" => Ok(OwnershipMode::Emulated),
            "off" => Ok(OwnershipMode::Off),
            other => Err(Error::config_invalid(format!(
                "unknown ownership mode '{}' (expected auto, native, emulated or off)",
                other
            ))),
        }
    }
}

/// Config file watching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct WatchSettings {
    /// Relaunch the renderer when the config file changes
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Debounce duration in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    500
}
