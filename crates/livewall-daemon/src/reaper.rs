//! Stale renderer cleanup
//!
//! A renderer started by a previous supervisor (crashed shell, reloaded
//! extension) keeps its window on screen. Before the first spawn the reaper
//! walks the process table and terminates every process whose command line
//! starts with our launch signature.

use std::fs;
use std::path::PathBuf;

use livewall_core::prelude::*;

use crate::signal::send_terminate;

/// One row of the OS process table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    /// Command line with argument separators rendered as spaces
    pub cmdline: String,
}

impl ProcessEntry {
    pub fn new(pid: u32, cmdline: impl Into<String>) -> Self {
        Self {
            pid,
            cmdline: cmdline.into(),
        }
    }
}

/// Access to the OS process table.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessLister: Send + Sync {
    fn list(&self) -> Result<Vec<ProcessEntry>>;

    /// Send a termination signal and return once it was delivered.
    fn terminate(&self, pid: u32) -> Result<()>;
}

/// [`ProcessLister`] backed by a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_cmdline(&self, pid: u32) -> Option<String> {
        let bytes = fs::read(self.root.join(pid.to_string()).join("cmdline")).ok()?;
        if bytes.is_empty() {
            // kernel threads and zombies
            return None;
        }
        Some(decode_cmdline(&bytes))
    }
}

/// NUL separators and other control bytes become spaces.
fn decode_cmdline(bytes: &[u8]) -> String {
    let bytes: Vec<u8> = bytes
        .iter()
        .map(|&b| if b < 32 { b' ' } else { b })
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

impl ProcessLister for ProcFs {
    fn list(&self) -> Result<Vec<ProcessEntry>> {
        let dir = fs::read_dir(&self.root)
            .map_err(|e| Error::process_table(format!("{}: {}", self.root.display(), e)))?;

        let mut entries = Vec::new();
        for entry in dir.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };
            // Processes may vanish between readdir and read
            if let Some(cmdline) = self.read_cmdline(pid) {
                entries.push(ProcessEntry { pid, cmdline });
            }
        }
        entries.sort_by_key(|e| e.pid);
        Ok(entries)
    }

    fn terminate(&self, pid: u32) -> Result<()> {
        send_terminate(pid)
    }
}

/// Terminates renderer instances left over from an earlier supervisor.
pub struct StaleInstanceReaper {
    lister: Box<dyn ProcessLister>,
    signature: String,
}

impl StaleInstanceReaper {
    pub fn new(lister: Box<dyn ProcessLister>, signature: impl Into<String>) -> Self {
        Self {
            lister,
            signature: signature.into(),
        }
    }

    /// Reaper over the live `/proc` table.
    pub fn with_procfs(signature: impl Into<String>) -> Self {
        Self::new(Box::new(ProcFs::default()), signature)
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Terminate every matching process. Returns how many were signalled.
    ///
    /// Never fails: an unreadable process table means there is nothing to do.
    pub fn reap(&self) -> usize {
        if self.signature.trim().is_empty() {
            return 0;
        }

        let entries = match self.lister.list() {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping stale renderer scan: {}", e);
                return 0;
            }
        };

        let own_pid = std::process::id();
        let mut reaped = 0;
        for entry in entries {
            if entry.pid == own_pid || !entry.cmdline.starts_with(&self.signature) {
                continue;
            }
            info!("Terminating stale renderer (PID {}): {}", entry.pid, entry.cmdline.trim_end());
            match self.lister.terminate(entry.pid) {
                Ok(()) => reaped += 1,
                Err(e) => warn!("Failed to terminate stale renderer {}: {}", entry.pid, e),
            }
        }
        reaped
    }
}
