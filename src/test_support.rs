//! Shared test doubles. The module is only compiled for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::{AppError, Result};
use crate::host::{
    ConnectionParams, HistoryMatch, HostBridge, OutputEvents, OUTPUT_CHANNEL_CAPACITY,
};
use crate::session::SessionId;
use crate::terminal::{CellMetrics, PixelRect, TermView};

/// One recorded host invocation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Connect {
        session: String,
        server: String,
    },
    Resize {
        session: String,
        rows: u16,
        cols: u16,
    },
    WriteInput {
        session: String,
        data: String,
    },
    Disconnect {
        session: String,
    },
    RecordHistory {
        server: String,
        command: String,
        source: String,
    },
    SearchHistory {
        server: Option<String>,
        query: String,
    },
}

/// Scripted in-memory host that records every call it receives.
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    connect_results: Mutex<VecDeque<std::result::Result<(), String>>>,
    connect_delay: Mutex<Option<Duration>>,
    fail_disconnect: Mutex<bool>,
    search_results: Mutex<Vec<HistoryMatch>>,
    search_delay: Mutex<Option<Duration>>,
    channels: Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for the next connect call. Connects beyond the
    /// scripted queue succeed.
    pub fn fail_next_connect(&self, message: &str) {
        self.connect_results
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_fail_disconnect(&self, fail: bool) {
        *self.fail_disconnect.lock().unwrap() = fail;
    }

    pub fn set_search_results(&self, results: Vec<HistoryMatch>) {
        *self.search_results.lock().unwrap() = results;
    }

    pub fn set_search_delay(&self, delay: Duration) {
        *self.search_delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Input chunks written for one session, in order.
    pub fn written(&self, session: &SessionId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::WriteInput { session: s, data } if s == session.as_str() => Some(data),
                _ => None,
            })
            .collect()
    }

    /// (rows, cols) pairs sent for one session, in order.
    pub fn resizes(&self, session: &SessionId) -> Vec<(u16, u16)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Resize {
                    session: s,
                    rows,
                    cols,
                } if s == session.as_str() => Some((rows, cols)),
                _ => None,
            })
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, HostCall::Connect { .. }))
            .count()
    }

    pub fn disconnect_count(&self, session: &SessionId) -> usize {
        self.calls()
            .iter()
            .filter(|call| {
                matches!(call, HostCall::Disconnect { session: s } if s == session.as_str())
            })
            .count()
    }

    pub fn recorded_history(&self) -> Vec<(String, String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::RecordHistory {
                    server,
                    command,
                    source,
                } => Some((server, command, source)),
                _ => None,
            })
            .collect()
    }

    /// Push bytes into a session's output stream, as the host would.
    pub fn inject_output(&self, session: &SessionId, bytes: &[u8]) {
        let _ = self.channel(session.as_str()).send(bytes.to_vec());
    }

    fn channel(&self, session: &str) -> broadcast::Sender<Vec<u8>> {
        self.channels
            .lock()
            .unwrap()
            .entry(session.to_string())
            .or_insert_with(|| broadcast::channel(OUTPUT_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HostBridge for RecordingHost {
    async fn connect(&self, session: &SessionId, params: &ConnectionParams) -> Result<()> {
        self.record(HostCall::Connect {
            session: session.as_str().to_string(),
            server: params.server.id.clone(),
        });
        let delay = *self.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.connect_results.lock().unwrap().pop_front() {
            Some(Err(message)) => Err(AppError::Host(message)),
            _ => Ok(()),
        }
    }

    async fn resize(&self, session: &SessionId, rows: u16, cols: u16) -> Result<()> {
        self.record(HostCall::Resize {
            session: session.as_str().to_string(),
            rows,
            cols,
        });
        Ok(())
    }

    async fn write_input(&self, session: &SessionId, data: &str) -> Result<()> {
        self.record(HostCall::WriteInput {
            session: session.as_str().to_string(),
            data: data.to_string(),
        });
        Ok(())
    }

    async fn disconnect(&self, session: &SessionId) -> Result<()> {
        self.record(HostCall::Disconnect {
            session: session.as_str().to_string(),
        });
        if *self.fail_disconnect.lock().unwrap() {
            return Err(AppError::Host("disconnect refused".to_string()));
        }
        Ok(())
    }

    async fn record_history(&self, server_id: &str, command: &str, source: &str) -> Result<()> {
        self.record(HostCall::RecordHistory {
            server: server_id.to_string(),
            command: command.to_string(),
            source: source.to_string(),
        });
        Ok(())
    }

    async fn search_history(
        &self,
        server_id: Option<&str>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<HistoryMatch>> {
        self.record(HostCall::SearchHistory {
            server: server_id.map(str::to_string),
            query: query.to_string(),
        });
        let delay = *self.search_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut results = self.search_results.lock().unwrap().clone();
        results.truncate(limit);
        Ok(results)
    }

    fn subscribe_output(&self, session: &SessionId) -> OutputEvents {
        self.channel(session.as_str()).subscribe()
    }
}

/// Fixed-geometry view for fitter and anchor tests.
pub struct StubView {
    pub cursor: (usize, usize),
    pub metrics: CellMetrics,
    pub rect: PixelRect,
}

impl StubView {
    /// A visible 80x24 view with the standard cell metrics and padding.
    pub fn standard() -> Self {
        Self {
            cursor: (0, 0),
            metrics: CellMetrics {
                width: 9.0,
                height: 18.0,
            },
            rect: PixelRect {
                x: 0.0,
                y: 0.0,
                width: 80.0 * 9.0 + 16.0,
                height: 24.0 * 18.0 + 16.0,
            },
        }
    }

    pub fn hidden() -> Self {
        Self {
            rect: PixelRect::default(),
            ..Self::standard()
        }
    }
}

impl TermView for StubView {
    fn cursor_cell(&self) -> (usize, usize) {
        self.cursor
    }

    fn cell_metrics(&self) -> CellMetrics {
        self.metrics
    }

    fn container_rect(&self) -> PixelRect {
        self.rect
    }
}
