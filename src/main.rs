//! livewall - animated wallpaper renderer supervisor
//!
//! This is the binary entry point. All logic lives in the workspace crates.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{error, info};

use livewall_app::config::{default_config_path, load_settings, OwnershipMode, SettingsOverrides};
use livewall_app::signals::spawn_signal_handler;
use livewall_app::{Engine, HostBindings};
use livewall_core::logging::{self, LogTarget};

/// livewall - keeps an animated wallpaper renderer running
#[derive(Parser, Debug)]
#[command(name = "livewall")]
#[command(about = "Supervise an animated wallpaper renderer process", long_about = None)]
struct Args {
    /// Settings file (defaults to <config dir>/livewall/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Renderer install directory
    #[arg(long, value_name = "DIR")]
    install_path: Option<PathBuf>,

    /// Renderer entry point (defaults to <install path>/renderer.js)
    #[arg(long, value_name = "PATH")]
    entry: Option<PathBuf>,

    /// Window ownership mode: auto, native, emulated or off
    #[arg(long, value_name = "MODE")]
    ownership: Option<OwnershipMode>,

    /// Log to stderr instead of the rolling log file
    #[arg(long)]
    log_stderr: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let target = if args.log_stderr {
        LogTarget::Stderr
    } else {
        LogTarget::File
    };
    logging::init(target)?;

    let config_path = args.config.or_else(default_config_path);
    let mut settings = config_path
        .as_deref()
        .map(load_settings)
        .unwrap_or_default();

    let overrides = SettingsOverrides {
        install_path: args.install_path,
        entry: args.entry,
        ownership: args.ownership,
    };
    overrides.apply(&mut settings);

    let launch = settings.launch_spec();
    if let Err(e) = launch.validate() {
        error!("Cannot start renderer: {}", e);
        return Err(e.into());
    }
    info!("Renderer: {}", launch.signature());

    let engine = Engine::new(settings, overrides, config_path, HostBindings::default());
    spawn_signal_handler(engine.msg_sender());

    let result = engine.run().await;
    if let Err(ref e) = result {
        error!("Supervisor error: {:?}", e);
    }

    info!("livewall exiting");
    Ok(result?)
}
