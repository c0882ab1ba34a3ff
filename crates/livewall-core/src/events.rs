//! Process lifecycle events delivered to the supervisor control loop

use std::fmt;

use crate::types::ProcessId;

/// How a renderer process ended, as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Process exited normally with the given code
    Exited { code: i32 },
    /// Process was terminated by a signal
    Signaled { signal: i32 },
    /// Exit status could not be determined (wait failed)
    Unknown,
}

/// Exit classification driving the restart backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Clean,
    Abnormal,
}

impl ExitOutcome {
    /// Only a normal exit with code 0 is clean.
    pub fn kind(&self) -> ExitKind {
        match self {
            ExitOutcome::Exited { code: 0 } => ExitKind::Clean,
            _ => ExitKind::Abnormal,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.kind() == ExitKind::Clean
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitOutcome::Exited { code } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(unix)]
impl From<std::process::ExitStatus> for ExitOutcome {
    fn from(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        if let Some(code) = status.code() {
            ExitOutcome::Exited { code }
        } else if let Some(signal) = status.signal() {
            ExitOutcome::Signaled { signal }
        } else {
            ExitOutcome::Unknown
        }
    }
}

#[cfg(not(unix))]
impl From<std::process::ExitStatus> for ExitOutcome {
    fn from(status: std::process::ExitStatus) -> Self {
        match status.code() {
            Some(code) => ExitOutcome::Exited { code },
            None => ExitOutcome::Unknown,
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited { code } => write!(f, "exit code {}", code),
            ExitOutcome::Signaled { signal } => write!(f, "signal {}", signal),
            ExitOutcome::Unknown => write!(f, "unknown status"),
        }
    }
}

/// Events emitted by renderer process background tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// The process identified by `id` has exited
    Exited { id: ProcessId, outcome: ExitOutcome },
}

impl ProcessEvent {
    pub fn process_id(&self) -> ProcessId {
        match self {
            ProcessEvent::Exited { id, .. } => *id,
        }
    }
}
