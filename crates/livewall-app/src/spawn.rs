//! Process launch seam
//!
//! The supervisor asks a [`Spawner`] for a new process instead of touching the
//! OS directly, so its state machine can be driven by fake handles in tests.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use livewall_core::{LogSink, ProcessEvent, ProcessId};
use livewall_daemon::{OwnershipQuery, ProcessHandle};

/// Everything needed to launch one renderer instance
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub id: ProcessId,
    pub label: String,
    pub extra_arg: String,
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub ownership: Option<OwnershipQuery>,
}

pub trait Spawner: Send {
    /// Launch a process. `None` if the OS refused to create it.
    fn spawn(&mut self, request: SpawnRequest) -> Option<ProcessHandle>;
}

/// Launches real child processes.
///
/// Every handle reports its exit on the shared `events` channel and relays
/// output to `sink`.
pub struct OsSpawner {
    sink: Arc<dyn LogSink>,
    events: mpsc::Sender<ProcessEvent>,
}

impl OsSpawner {
    pub fn new(sink: Arc<dyn LogSink>, events: mpsc::Sender<ProcessEvent>) -> Self {
        Self { sink, events }
    }
}

impl Spawner for OsSpawner {
    fn spawn(&mut self, request: SpawnRequest) -> Option<ProcessHandle> {
        let mut handle = ProcessHandle::new(
            request.id,
            request.label,
            request.extra_arg,
            request.ownership,
        );
        handle
            .spawn(
                &request.argv,
                &request.cwd,
                Arc::clone(&self.sink),
                self.events.clone(),
            )
            .then_some(handle)
    }
}
