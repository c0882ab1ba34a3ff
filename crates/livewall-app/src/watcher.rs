//! Config file watcher
//!
//! Watches the directory holding the settings file, so editors that replace
//! the file on save are noticed too, and sends [`Message::ReloadSettings`]
//! after a debounced change to that one file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use tokio::sync::{mpsc, oneshot};

use livewall_core::prelude::*;

use crate::message::Message;

/// Watches one settings file for changes
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            path: path.into(),
            debounce,
            stop_tx: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start watching. Sends `Message::ReloadSettings` on change.
    pub fn start(&mut self, message_tx: mpsc::Sender<Message>) -> Result<()> {
        if self.is_running() {
            return Err(Error::watcher("watcher is already running"));
        }
        let (dir, file_name) = split_config_path(&self.path)?;

        let debounce = self.debounce;
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);

        tokio::task::spawn_blocking(move || {
            run_watcher(dir, file_name, debounce, message_tx, stop_rx);
        });

        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn split_config_path(path: &Path) -> Result<(PathBuf, OsString)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::watcher(format!("not a file path: {}", path.display())))?
        .to_os_string();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

/// Whether `event` touches the settings file (reads don't count)
fn is_config_event(event: &notify::Event, file_name: &OsString) -> bool {
    !event.kind.is_access()
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

fn run_watcher(
    dir: PathBuf,
    file_name: OsString,
    debounce: Duration,
    message_tx: mpsc::Sender<Message>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let tx = message_tx.clone();
    let watched_name = file_name.clone();

    let debouncer_result = new_debouncer(debounce, None, move |result: DebounceEventResult| {
        match result {
            Ok(events) => {
                if !events.iter().any(|e| is_config_event(e, &watched_name)) {
                    return;
                }
                debug!("Config file changed");
                let _ = tx.blocking_send(Message::ReloadSettings);
            }
            Err(errors) => {
                for error in errors {
                    warn!("Config watcher error: {:?}", error);
                    let _ = tx.blocking_send(Message::WatcherError {
                        message: error.to_string(),
                    });
                }
            }
        }
    });

    let mut debouncer = match debouncer_result {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to create config watcher: {}", e);
            let _ = message_tx.blocking_send(Message::WatcherError {
                message: format!("Failed to create watcher: {}", e),
            });
            return;
        }
    };

    if let Err(e) = debouncer.watch(&dir, RecursiveMode::NonRecursive) {
        warn!("Failed to watch {}: {}", dir.display(), e);
        let _ = message_tx.blocking_send(Message::WatcherError {
            message: format!("Failed to watch {}: {}", dir.display(), e),
        });
        return;
    }
    info!("Watching: {}", dir.join(&file_name).display());

    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(oneshot::error::TryRecvError::Closed) => {
                info!("Config watcher stopping");
                break;
            }
            Err(oneshot::error::TryRecvError::Empty) => {
                std::thread::sleep(Duration::from_millis(100));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, EventKind, ModifyKind};

    fn event(kind: EventKind, path: &str) -> notify::Event {
        notify::Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_split_config_path() {
        let (dir, name) = split_config_path(Path::new("/home/u/.config/livewall/config.toml")).unwrap();
        assert_eq!(dir, PathBuf::from("/home/u/.config/livewall"));
        assert_eq!(name, OsString::from("config.toml"));

        let (dir, _) = split_config_path(Path::new("config.toml")).unwrap();
        assert_eq!(dir, PathBuf::from("."));

        assert!(split_config_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_only_config_file_events_count() {
        let name = OsString::from("config.toml");

        assert!(is_config_event(
            &event(EventKind::Modify(ModifyKind::Any), "/cfg/config.toml"),
            &name
        ));
        assert!(is_config_event(
            &event(EventKind::Create(CreateKind::File), "/cfg/config.toml"),
            &name
        ));
        assert!(!is_config_event(
            &event(EventKind::Modify(ModifyKind::Any), "/cfg/other.toml"),
            &name
        ));
        assert!(!is_config_event(
            &event(EventKind::Access(AccessKind::Any), "/cfg/config.toml"),
            &name
        ));
    }

    #[test]
    fn test_config_watcher_creation() {
        let watcher = ConfigWatcher::new("/tmp/livewall/config.toml", Duration::from_millis(500));
        assert_eq!(watcher.path(), Path::new("/tmp/livewall/config.toml"));
        assert!(!watcher.is_running());
    }

    #[tokio::test]
    async fn test_config_watcher_double_start_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = ConfigWatcher::new(dir.path().join("config.toml"), Duration::from_millis(50));
        let (tx, _rx) = mpsc::channel(8);

        assert!(watcher.start(tx.clone()).is_ok());
        assert!(watcher.is_running());
        assert!(matches!(watcher.start(tx), Err(Error::Watcher { .. })));

        watcher.stop();
        assert!(!watcher.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_config_change_triggers_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[restart]\nfast_ms = 100\n").unwrap();

        let mut watcher = ConfigWatcher::new(&path, Duration::from_millis(50));
        let (tx, mut rx) = mpsc::channel(8);
        watcher.start(tx).unwrap();
        // Give the blocking task time to register the watch
        tokio::time::sleep(Duration::from_millis(300)).await;

        std::fs::write(dir.path().join("unrelated.txt"), "x").unwrap();
        std::fs::write(&path, "[restart]\nfast_ms = 200\n").unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("a reload should be requested");
        assert_eq!(msg, Some(Message::ReloadSettings));
        watcher.stop();
    }
}
