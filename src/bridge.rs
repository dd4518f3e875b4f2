//! Data stream bridge between a session's host stream and the UI loop.
//!
//! Each attached session gets two tasks: a pump that forwards host output
//! chunks to the event loop, and a writer that drains a keystroke queue
//! into the host. The queue has a single consumer, so keystrokes reach the
//! host in the exact order they were typed even though each write awaits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::event::Event;
use crate::host::HostBridge;
use crate::session::SessionId;

/// Tracks the command line being typed, mirroring the host's line editing
/// closely enough to harvest executed commands for history.
#[derive(Debug, Default)]
pub struct LineTracker {
    pending: String,
}

impl LineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one keystroke chunk. Returns the completed command when the
    /// chunk is a carriage return and the pending line is non-blank.
    ///
    /// Chunks are classified as a whole: a lone CR flushes, a lone DEL
    /// erases, chunks starting with a printable character append, and
    /// control-initiated chunks (escape sequences, ^C and friends) are
    /// ignored so cursor keys never pollute the recorded command.
    pub fn feed(&mut self, data: &str) -> Option<String> {
        if data == "\r" {
            let line = self.pending.trim().to_string();
            self.pending.clear();
            if line.is_empty() {
                return None;
            }
            return Some(line);
        }
        if data == "\x7f" {
            self.pending.pop();
            return None;
        }
        match data.chars().next() {
            Some(first) if !first.is_control() => self.pending.push_str(data),
            _ => {}
        }
        None
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Live output pump + keystroke writer for one session.
pub struct StreamBridge {
    session: SessionId,
    attached: Arc<AtomicBool>,
    input_tx: mpsc::UnboundedSender<String>,
    pump: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl StreamBridge {
    /// Subscribe to the session's output stream and start both tasks.
    /// Subscribing before `connect` is valid, so no output is lost to a
    /// race with the first host bytes.
    pub fn open(
        session: SessionId,
        host: Arc<dyn HostBridge>,
        event_tx: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let attached = Arc::new(AtomicBool::new(true));
        let mut output = host.subscribe_output(&session);

        let pump_session = session.clone();
        let pump_attached = attached.clone();
        let pump = tokio::spawn(async move {
            loop {
                match output.recv().await {
                    Ok(bytes) => {
                        if !pump_attached.load(Ordering::Relaxed) {
                            break;
                        }
                        let forwarded = event_tx.send(Event::SessionOutput {
                            session: pump_session.clone(),
                            bytes,
                        });
                        if forwarded.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(session = %pump_session, skipped, "output stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
        let writer_session = session.clone();
        let writer = tokio::spawn(async move {
            while let Some(chunk) = input_rx.recv().await {
                if let Err(err) = host.write_input(&writer_session, &chunk).await {
                    warn!(session = %writer_session, %err, "host write failed, keystrokes dropped");
                }
            }
        });

        Self {
            session,
            attached,
            input_tx,
            pump,
            writer,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Queue a keystroke chunk for the host.
    pub fn send_input(&self, data: impl Into<String>) {
        if self.input_tx.send(data.into()).is_err() {
            debug!(session = %self.session, "input queue closed, keystroke dropped");
        }
    }

    #[cfg(test)]
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Relaxed)
    }

    /// Stop forwarding output and drop any queued keystrokes. Output that
    /// arrives after this point never reaches the event loop.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::Relaxed);
        self.pump.abort();
        self.writer.abort();
    }
}

impl Drop for StreamBridge {
    fn drop(&mut self) {
        self.detach();
    }
}
