//! Renderer launch description
//!
//! Builds the argv passed to the renderer and the command-line signature used
//! to recognise renderer instances left over from a previous supervisor.

use std::path::{Path, PathBuf};

use livewall_core::prelude::*;
use livewall_core::DisplayServer;

/// File name of the renderer entry point inside the install directory
pub const RENDERER_ENTRY: &str = "renderer.js";

/// Flag telling the renderer where its install directory is
pub const INSTALL_PATH_FLAG: &str = "-P";

/// Default interpreter the renderer entry point runs under
pub const DEFAULT_INTERPRETER: &str = "gjs";

/// Default marker appended to argv on the Wayland path
pub const DEFAULT_PLATFORM_MARKER: &str = "-U";

/// Everything needed to start one renderer instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Absolute path of the renderer entry point (argv[0])
    pub entry_path: PathBuf,
    /// Install directory passed via `-P`
    pub install_path: PathBuf,
    /// Interpreter named in the renderer's shebang; empty when it is a native binary
    pub interpreter: String,
    /// Working directory of the renderer
    pub working_dir: PathBuf,
    /// Startup marker required by the windowing collaborator on Wayland
    pub platform_marker: String,
}

impl LaunchSpec {
    /// Launch spec for a renderer installed under `install_path`.
    pub fn new(install_path: impl Into<PathBuf>) -> Self {
        let install_path = install_path.into();
        Self {
            entry_path: install_path.join(RENDERER_ENTRY),
            install_path,
            interpreter: DEFAULT_INTERPRETER.to_string(),
            working_dir: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
            platform_marker: DEFAULT_PLATFORM_MARKER.to_string(),
        }
    }

    pub fn with_entry(mut self, entry_path: impl Into<PathBuf>) -> Self {
        self.entry_path = entry_path.into();
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_platform_marker(mut self, marker: impl Into<String>) -> Self {
        self.platform_marker = marker.into();
        self
    }

    /// Build the renderer argv.
    ///
    /// `[<entry>, "-P", <install path>]`, plus the platform marker when the
    /// renderer runs under Wayland.
    pub fn argv(&self, display: DisplayServer) -> Vec<String> {
        let mut argv = vec![
            self.entry_path.to_string_lossy().into_owned(),
            INSTALL_PATH_FLAG.to_string(),
            self.install_path.to_string_lossy().into_owned(),
        ];
        if display.is_wayland() && !self.platform_marker.is_empty() {
            argv.push(self.platform_marker.clone());
        }
        argv
    }

    /// Command-line prefix identifying a renderer started from this install.
    pub fn signature(&self) -> String {
        let entry = self.entry_path.to_string_lossy();
        if self.interpreter.is_empty() {
            entry.into_owned()
        } else {
            format!("{} {}", self.interpreter, entry)
        }
    }

    /// Check that the entry point exists before the first launch.
    pub fn validate(&self) -> Result<()> {
        if !self.entry_path.is_absolute() {
            return Err(Error::config_invalid(format!(
                "renderer entry must be an absolute path: {}",
                self.entry_path.display()
            )));
        }
        if !self.entry_path.exists() {
            return Err(Error::renderer_not_found(&self.entry_path));
        }
        Ok(())
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_entry_is_inside_install_path() {
        let spec = LaunchSpec::new("/opt/livewall");
        assert_eq!(spec.entry_path, PathBuf::from("/opt/livewall/renderer.js"));
        assert_eq!(spec.interpreter, "gjs");
    }

    #[test]
    fn test_argv_x11_has_no_marker() {
        let spec = LaunchSpec::new("/opt/livewall");
        assert_eq!(
            spec.argv(DisplayServer::X11),
            vec!["/opt/livewall/renderer.js", "-P", "/opt/livewall"]
        );
    }

    #[test]
    fn test_argv_wayland_appends_marker() {
        let spec = LaunchSpec::new("/opt/livewall");
        let argv = spec.argv(DisplayServer::Wayland);
        assert_eq!(argv.len(), 4);
        assert_eq!(argv[0], "/opt/livewall/renderer.js");
        assert_eq!(argv[3], "-U");
    }

    #[test]
    fn test_argv_wayland_skips_empty_marker() {
        let spec = LaunchSpec::new("/opt/livewall").with_platform_marker("");
        assert_eq!(spec.argv(DisplayServer::Wayland).len(), 3);
    }

    #[test]
    fn test_signature_with_interpreter() {
        let spec = LaunchSpec::new("/opt/livewall");
        assert_eq!(spec.signature(), "gjs /opt/livewall/renderer.js");
    }

    #[test]
    fn test_signature_for_native_binary() {
        let spec = LaunchSpec::new("/opt/livewall")
            .with_entry("/opt/livewall/bin/renderer")
            .with_interpreter("");
        assert_eq!(spec.signature(), "/opt/livewall/bin/renderer");
    }

    #[test]
    fn test_validate_missing_entry() {
        let spec = LaunchSpec::new("/nonexistent/livewall");
        assert!(matches!(
            spec.validate(),
            Err(Error::RendererNotFound { .. })
        ));
    }

    #[test]
    fn test_validate_relative_entry() {
        let spec = LaunchSpec::new("/opt/livewall").with_entry("renderer.js");
        assert!(matches!(spec.validate(), Err(Error::ConfigInvalid { .. })));
    }

    #[test]
    fn test_validate_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(RENDERER_ENTRY), "#!/bin/sh\n").unwrap();

        let spec = LaunchSpec::new(dir.path());
        assert!(spec.validate().is_ok());
    }
}
