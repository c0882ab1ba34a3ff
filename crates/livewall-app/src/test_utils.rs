//! Fakes for driving the supervisor without real processes or timers

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use livewall_core::ProcessId;
use livewall_daemon::{ProcessHandle, ProcessWindows};

use crate::spawn::{SpawnRequest, Spawner};
use crate::timer::{RestartTimer, TimerId};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct SpawnLog {
    requests: Vec<SpawnRequest>,
    windows: Vec<(ProcessId, Arc<ProcessWindows>)>,
    /// Scripted outcomes; an empty script means every launch succeeds
    script: VecDeque<bool>,
}

/// Spawner returning fake running handles.
///
/// Clones share one log so a test can keep a copy after moving the spawner
/// into the supervisor.
#[derive(Debug, Clone, Default)]
pub struct FakeSpawner {
    log: Arc<Mutex<SpawnLog>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue launch outcomes: `false` makes the next launch fail.
    pub fn script(&self, outcomes: &[bool]) {
        lock(&self.log).script.extend(outcomes.iter().copied());
    }

    pub fn spawn_count(&self) -> usize {
        lock(&self.log).requests.len()
    }

    pub fn requests(&self) -> Vec<SpawnRequest> {
        lock(&self.log).requests.clone()
    }

    pub fn last_request(&self) -> Option<SpawnRequest> {
        lock(&self.log).requests.last().cloned()
    }

    /// Handles spawned so far that still report as running
    pub fn running_count(&self) -> usize {
        lock(&self.log)
            .windows
            .iter()
            .filter(|(_, w)| w.is_running())
            .count()
    }
}

impl Spawner for FakeSpawner {
    fn spawn(&mut self, request: SpawnRequest) -> Option<ProcessHandle> {
        let mut log = lock(&self.log);
        let succeeds = log.script.pop_front().unwrap_or(true);
        log.requests.push(request.clone());
        if !succeeds {
            return None;
        }

        let pid = 1000 + request.id.0 as u32;
        let handle = ProcessHandle::launched_for_test(
            request.id,
            request.label,
            request.ownership,
            Some(pid),
        );
        log.windows.push((handle.id(), handle.windows()));
        Some(handle)
    }
}

#[derive(Debug, Default)]
struct TimerLog {
    armed: Vec<(TimerId, Duration)>,
    cancelled: Vec<TimerId>,
}

/// Restart timer that only records what it was asked to do.
#[derive(Debug, Clone, Default)]
pub struct FakeTimer {
    log: Arc<Mutex<TimerLog>>,
}

impl FakeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> Vec<(TimerId, Duration)> {
        lock(&self.log).armed.clone()
    }

    pub fn last_armed(&self) -> Option<(TimerId, Duration)> {
        lock(&self.log).armed.last().copied()
    }

    pub fn cancelled(&self) -> Vec<TimerId> {
        lock(&self.log).cancelled.clone()
    }

    /// Armed and not cancelled
    pub fn active(&self) -> Vec<TimerId> {
        let log = lock(&self.log);
        log.armed
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !log.cancelled.contains(id))
            .collect()
    }
}

impl RestartTimer for FakeTimer {
    fn arm(&mut self, id: TimerId, delay: Duration) {
        lock(&self.log).armed.push((id, delay));
    }

    fn cancel(&mut self, id: TimerId) {
        lock(&self.log).cancelled.push(id);
    }
}
