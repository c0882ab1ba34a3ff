//! Configuration file parsing for livewall
//!
//! Supports `<config_dir>/livewall/config.toml`. Every key is optional.

pub mod settings;
pub mod types;

pub use settings::{
    default_config_path, load_settings, try_load_settings, APP_DIR, CONFIG_FILENAME,
};
pub use types::*;
