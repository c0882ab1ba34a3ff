//! Settings file loading

use std::path::{Path, PathBuf};

use livewall_core::prelude::*;

use super::types::Settings;

/// Directory name under the user config dir
pub const APP_DIR: &str = "livewall";

/// Settings file name
pub const CONFIG_FILENAME: &str = "config.toml";

/// `<config_dir>/livewall/config.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

/// Load settings from `path`.
///
/// A missing file is normal; an unreadable or invalid one is logged. Both fall
/// back to defaults so the renderer still starts.
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        debug!("No config file at {:?}, using defaults", path);
        return Settings::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            Settings::default()
        }
    }
}

/// Like [`load_settings`], but a parse failure is an error.
///
/// Used on reload: a broken file keeps the running configuration.
pub fn try_load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::config_invalid(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OwnershipMode;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings(&dir.path().join(CONFIG_FILENAME));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[restart\nfast_ms = ").unwrap();

        assert_eq!(load_settings(&path), Settings::default());
    }

    #[test]
    fn test_load_valid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[renderer]
install_path = "/opt/livewall"
label = "Wallpaper"

[windowing]
ownership = "off"

[watch]
enabled = false
"#,
        )
        .unwrap();

        let settings = load_settings(&path);
        assert_eq!(settings.renderer.install_path, PathBuf::from("/opt/livewall"));
        assert_eq!(settings.renderer.label, "Wallpaper");
        assert_eq!(settings.windowing.ownership, OwnershipMode::Off);
        assert!(!settings.watch.enabled);
        assert_eq!(settings.restart.slow_ms, 1000);
    }

    #[test]
    fn test_try_load_reports_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);

        assert!(matches!(
            try_load_settings(&path),
            Err(Error::ConfigNotFound { .. })
        ));

        std::fs::write(&path, "[restart]\nfast_ms = \"soon\"\n").unwrap();
        assert!(matches!(
            try_load_settings(&path),
            Err(Error::ConfigInvalid { .. })
        ));

        std::fs::write(&path, "[restart]\nfast_ms = 50\n").unwrap();
        assert_eq!(try_load_settings(&path).unwrap().restart.fast_ms, 50);
    }

    #[test]
    fn test_default_config_path_layout() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("livewall/config.toml"));
        }
    }
}
