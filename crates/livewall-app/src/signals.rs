//! OS signal handling
//!
//! SIGINT and SIGTERM shut the supervisor down gracefully. SIGHUP reloads
//! the settings and relaunches the renderer.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use livewall_core::prelude::*;

use crate::message::Message;

/// Spawn a task that turns OS signals into control messages
pub fn spawn_signal_handler(tx: mpsc::Sender<Message>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = listen(tx).await {
            error!("Signal handler error: {}", e);
        }
    })
}

#[cfg(unix)]
async fn listen(tx: mpsc::Sender<Message>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

    loop {
        let msg = tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
                Message::Quit
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
                Message::Quit
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading settings");
                Message::ReloadSettings
            }
        };

        let quit = msg == Message::Quit;
        if tx.send(msg).await.is_err() {
            return Err(Error::ChannelClosed);
        }
        if quit {
            return Ok(());
        }
    }
}

#[cfg(not(unix))]
async fn listen(tx: mpsc::Sender<Message>) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C");
    tx.send(Message::Quit)
        .await
        .map_err(|_| Error::ChannelClosed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[serial_test::serial]
    async fn test_signal_handler_spawn() {
        let (tx, mut rx) = mpsc::channel::<Message>(1);

        let handle = spawn_signal_handler(tx);
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        // No signal sent yet
        assert!(rx.try_recv().is_err());
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial_test::serial]
    async fn test_sighup_requests_reload() {
        let (tx, mut rx) = mpsc::channel::<Message>(4);
        let handle = spawn_signal_handler(tx);
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        nix::sys::signal::raise(nix::sys::signal::Signal::SIGHUP).unwrap();

        let msg = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(msg, Some(Message::ReloadSettings));
        assert!(!handle.is_finished());
        handle.abort();
    }
}
