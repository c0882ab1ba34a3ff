//! Destination for renderer output lines
//!
//! The output relay forwards every line the renderer prints to a [`LogSink`],
//! tagged with the process label. [`TracingSink`] routes lines into the
//! regular `tracing` pipeline; [`CaptureSink`] keeps them in memory.

use std::sync::{Mutex, PoisonError};

use crate::error::Error;

/// Receives renderer output and relay failures.
pub trait LogSink: Send + Sync {
    /// A single line of renderer output
    fn log(&self, label: &str, line: &str);

    /// A read failure that ended the relay loop
    fn log_error(&self, label: &str, error: &Error);
}

/// Forwards renderer output to `tracing` under the `renderer` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, label: &str, line: &str) {
        tracing::info!(target: "renderer", label, "{}: {}", label, line);
    }

    fn log_error(&self, label: &str, error: &Error) {
        tracing::error!(target: "renderer", label, "{}_Error: {}", label, error);
    }
}

/// One entry recorded by [`CaptureSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedLine {
    Output { label: String, line: String },
    Error { label: String, message: String },
}

/// Keeps every forwarded line in memory.
#[derive(Debug, Default)]
pub struct CaptureSink {
    entries: Mutex<Vec<CapturedLine>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn entries(&self) -> Vec<CapturedLine> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Output lines only, without labels
    pub fn lines(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                CapturedLine::Output { line, .. } => Some(line),
                CapturedLine::Error { .. } => None,
            })
            .collect()
    }

    /// Number of recorded relay errors
    pub fn error_count(&self) -> usize {
        self.entries()
            .iter()
            .filter(|e| matches!(e, CapturedLine::Error { .. }))
            .count()
    }

    fn push(&self, entry: CapturedLine) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

impl LogSink for CaptureSink {
    fn log(&self, label: &str, line: &str) {
        self.push(CapturedLine::Output {
            label: label.to_string(),
            line: line.to_string(),
        });
    }

    fn log_error(&self, label: &str, error: &Error) {
        self.push(CapturedLine::Error {
            label: label.to_string(),
            message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink_records_lines_in_order() {
        let sink = CaptureSink::new();
        sink.log("Renderer", "first");
        sink.log("Renderer", "second");

        assert_eq!(sink.lines(), vec!["first", "second"]);
        assert_eq!(
            sink.entries()[0],
            CapturedLine::Output {
                label: "Renderer".to_string(),
                line: "first".to_string()
            }
        );
    }

    #[test]
    fn test_capture_sink_counts_errors() {
        let sink = CaptureSink::new();
        sink.log("Renderer", "ok");
        sink.log_error("Renderer", &Error::process("broken pipe"));

        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.lines().len(), 1);
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        let sink = TracingSink;
        sink.log("Renderer", "hello");
        sink.log_error("Renderer", &Error::ChannelClosed);
    }
}
