//! Renderer output relay
//!
//! Forwards every line a renderer writes to its merged stdout/stderr to a [`LogSink`],
//! prefixed with the process label. The relay is a detached background task:
//! nothing awaits it, so it never returns an error.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use livewall_core::prelude::*;
use livewall_core::LogSink;

/// Longest line forwarded as-is; the rest of a longer line is dropped.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Reads the output of a renderer line by line.
pub struct OutputRelay {
    label: String,
    sink: Arc<dyn LogSink>,
    cancel: CancellationToken,
    max_line: usize,
}

impl OutputRelay {
    pub fn new(label: impl Into<String>, sink: Arc<dyn LogSink>, cancel: CancellationToken) -> Self {
        Self {
            label: label.into(),
            sink,
            cancel,
            max_line: MAX_LINE_BYTES,
        }
    }

    /// Cap on the bytes buffered for one line
    pub fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line.max(1);
        self
    }

    /// Spawn the relay loop onto the runtime.
    pub fn spawn<R>(self, reader: R) -> tokio::task::JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(self.run(reader))
    }

    /// Read until end-of-stream, cancellation, or the first read error.
    ///
    /// Invalid UTF-8 is decoded lossily rather than treated as a read error.
    /// Empty lines are skipped. A line longer than the cap is forwarded once,
    /// cut at the cap and marked `[truncated]`, and the remainder up to the next
    /// newline is discarded. A read error is reported to the sink once,
    /// unless the token was already cancelled (expected teardown).
    pub async fn run<R>(self, reader: R)
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let limit = self.max_line as u64;
        // Inside the tail of a truncated line
        let mut discarding = false;

        loop {
            buf.clear();
            let mut limited = (&mut reader).take(limit);
            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    trace!("{} relay cancelled", self.label);
                    break;
                }
                read = limited.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => {
                    debug!("{} output stream closed", self.label);
                    break;
                }
                Ok(_) => {
                    let complete = buf.ends_with(b"\n");
                    if discarding {
                        discarding = !complete;
                        continue;
                    }
                    if !complete && buf.len() == self.max_line {
                        discarding = true;
                        let line = String::from_utf8_lossy(&buf);
                        self.sink.log(&self.label, &format!("{} [truncated]", line));
                        continue;
                    }
                    let line = String::from_utf8_lossy(trim_newline(&buf));
                    if !line.is_empty() {
                        self.sink.log(&self.label, &line);
                    }
                }
                Err(e) => {
                    if !self.cancel.is_cancelled() {
                        self.sink.log_error(&self.label, &Error::Io(e));
                    }
                    break;
                }
            }
        }
    }
}

fn trim_newline(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
