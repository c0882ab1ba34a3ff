//! Test utilities for daemon types
//!
//! Fake handles never own an OS process and never send signals, so supervisor
//! tests can drive exits by hand.

use std::sync::{Arc, Mutex, PoisonError};

use livewall_core::prelude::*;
use livewall_core::ProcessId;

use crate::ownership::{OwnershipQuery, WindowListFilter};
use crate::reaper::{ProcessEntry, ProcessLister};
use crate::ProcessHandle;

/// A handle that reports as running, without a real child.
pub fn running_handle(id: u64, pid: Option<u32>) -> ProcessHandle {
    ProcessHandle::launched_for_test(
        ProcessId(id),
        "Renderer",
        None,
        pid,
    )
}

/// A running handle on the emulated ownership path.
pub fn emulated_handle(id: u64, pid: u32, filter: WindowListFilter) -> ProcessHandle {
    ProcessHandle::launched_for_test(
        ProcessId(id),
        "Renderer",
        Some(OwnershipQuery::Emulated(filter)),
        Some(pid),
    )
}

/// A handle whose launch was refused by the OS.
pub fn failed_handle(id: u64) -> ProcessHandle {
    ProcessHandle::failed_for_test(ProcessId(id), "Renderer")
}

/// In-memory process table that records terminations.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessTable {
    entries: Arc<Mutex<Vec<ProcessEntry>>>,
    terminated: Arc<Mutex<Vec<u32>>>,
    unavailable: bool,
}

impl FakeProcessTable {
    pub fn new(entries: Vec<ProcessEntry>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
            ..Self::default()
        }
    }

    /// A table that fails to enumerate, like a system without procfs.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Pids that received a termination signal, in order
    pub fn terminated(&self) -> Vec<u32> {
        self.terminated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProcessLister for FakeProcessTable {
    fn list(&self) -> Result<Vec<ProcessEntry>> {
        if self.unavailable {
            return Err(Error::process_table("process table unavailable"));
        }
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        self.terminated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(pid);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|e| e.pid != pid);
        Ok(())
    }
}
