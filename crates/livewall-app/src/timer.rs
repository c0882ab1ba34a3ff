//! One-shot restart timers
//!
//! The supervisor only arms and cancels timers; firing comes back to the
//! control loop as [`Message::RestartTimerFired`] so the restart runs on the
//! same thread as every other state change.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use livewall_core::prelude::*;

use crate::message::Message;

/// Identity of one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

pub trait RestartTimer: Send {
    /// Fire `id` once after `delay`.
    fn arm(&mut self, id: TimerId, delay: Duration);

    /// Stop `id` from firing. Unknown or already-fired ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

/// [`RestartTimer`] backed by `tokio::time::sleep` tasks.
pub struct TokioRestartTimer {
    msg_tx: mpsc::Sender<Message>,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioRestartTimer {
    pub fn new(msg_tx: mpsc::Sender<Message>) -> Self {
        Self {
            msg_tx,
            tasks: HashMap::new(),
        }
    }

    /// Timers that have not fired or been cancelled yet
    pub fn pending(&self) -> usize {
        self.tasks.values().filter(|t| !t.is_finished()).count()
    }
}

impl RestartTimer for TokioRestartTimer {
    fn arm(&mut self, id: TimerId, delay: Duration) {
        self.tasks.retain(|_, task| !task.is_finished());

        let tx = self.msg_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(Message::RestartTimerFired { timer: id }).await.is_err() {
                debug!("Control loop gone before {} fired", id);
            }
        });
        if let Some(previous) = self.tasks.insert(id, task) {
            previous.abort();
        }
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
            trace!("Cancelled {}", id);
        }
    }
}

impl Drop for TokioRestartTimer {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
