//! End-to-end supervision of a real renderer process
//!
//! The renderer is a shell script installed into a temp directory, so these
//! tests exercise spawning, output relay, exit classification and the restart
//! timers together.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use livewall_app::config::{Settings, SettingsOverrides};
use livewall_app::{Engine, HostBindings, Message};
use livewall_core::{CaptureSink, DisplayServer};

fn install_renderer(dir: &Path, body: &str) {
    let entry = dir.join("renderer.js");
    std::fs::write(&entry, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&entry, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn settings(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.renderer.install_path = dir.to_path_buf();
    settings.renderer.working_dir = Some(dir.to_path_buf());
    settings.restart.fast_ms = 20;
    settings.restart.slow_ms = 50;
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

async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

fn count(sink: &CaptureSink, line: &str) -> usize {
    sink.lines().iter().filter(|l| l.as_str() == line).count()
}

#[tokio::test]
async fn test_crashing_renderer_is_restarted() {
    let dir = tempfile::tempdir().unwrap();
    install_renderer(dir.path(), "echo launched\nexit 1");
    let sink = Arc::new(CaptureSink::new());

    let engine = Engine::new(
        settings(dir.path()),
        SettingsOverrides::default(),
        None,
        host(sink.clone()),
    );
    let tx = engine.msg_sender();
    let run = tokio::spawn(engine.run());

    assert!(
        wait_for(|| count(&sink, "launched") >= 3).await,
        "renderer should be relaunched after each crash"
    );

    tx.send(Message::Quit).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("engine should stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_renderer_receives_install_path() {
    let dir = tempfile::tempdir().unwrap();
    install_renderer(dir.path(), "echo \"args: $1 $2\"\nexec sleep 60");
    let sink = Arc::new(CaptureSink::new());

    let engine = Engine::new(
        settings(dir.path()),
        SettingsOverrides::default(),
        None,
        host(sink.clone()),
    );
    let tx = engine.msg_sender();
    let run = tokio::spawn(engine.run());

    let expected = format!("args: -P {}", dir.path().display());
    assert!(wait_for(|| count(&sink, &expected) == 1).await);

    tx.send(Message::Quit).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_disable_stops_restarts_and_enable_resumes() {
    let dir = tempfile::tempdir().unwrap();
    install_renderer(dir.path(), "echo launched\nexec sleep 60");
    let sink = Arc::new(CaptureSink::new());

    let engine = Engine::new(
        settings(dir.path()),
        SettingsOverrides::default(),
        None,
        host(sink.clone()),
    );
    let tx = engine.msg_sender();
    let run = tokio::spawn(engine.run());

    assert!(wait_for(|| count(&sink, "launched") == 1).await);

    tx.send(Message::Disable).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(count(&sink, "launched"), 1);

    tx.send(Message::Enable).await.unwrap();
    assert!(wait_for(|| count(&sink, "launched") == 2).await);

    tx.send(Message::KillCurrentProcess).await.unwrap();
    assert!(wait_for(|| count(&sink, "launched") == 3).await);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(count(&sink, "launched"), 3);

    tx.send(Message::Quit).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
