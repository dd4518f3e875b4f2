//! Local PTY host: the in-process [`HostBridge`] implementation.
//!
//! Each session maps to one pseudo-terminal running a shell. Output is
//! pumped from a blocking reader task into a per-session broadcast channel;
//! subscribers can attach before `connect` so no early bytes are lost.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use portable_pty::{native_pty_system, CommandBuilder, MasterPty, PtySize};
use secrecy::ExposeSecret;
use tokio::sync::broadcast;
use tracing::debug;

use super::history::HistoryStore;
use super::{
    ConnectionParams, HistoryMatch, HostBridge, OutputEvents, OUTPUT_CHANNEL_CAPACITY,
};
use crate::error::{AppError, Result};
use crate::session::{AuthProvider, SessionId};

struct PtySession {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn portable_pty::Child + Send + Sync>,
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl PtySession {
    fn shutdown(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Hosts every live PTY session plus the shared command-history store.
pub struct PtyHost {
    sessions: Mutex<HashMap<String, PtySession>>,
    channels: Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>,
    history: Mutex<HistoryStore>,
    shell: String,
}

impl PtyHost {
    /// `shell` is the default command spawned per session; individual
    /// servers may override it.
    pub fn new(shell: String, history_capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            history: Mutex::new(HistoryStore::new(history_capacity)),
            shell,
        }
    }

    fn channel(&self, session: &SessionId) -> broadcast::Sender<Vec<u8>> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(session.as_str().to_string())
            .or_insert_with(|| broadcast::channel(OUTPUT_CHANNEL_CAPACITY).0)
            .clone()
    }

    fn spawn_shell(
        &self,
        session: &SessionId,
        params: &ConnectionParams,
    ) -> std::result::Result<PtySession, Box<dyn std::error::Error + Send + Sync>> {
        let pty_system = native_pty_system();
        let pair = pty_system.openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let command = params.server.command.clone().unwrap_or_else(|| self.shell.clone());
        let mut cmd = CommandBuilder::new(command);
        cmd.env("TERM", "xterm-256color");
        if let Some(home) = dirs::home_dir() {
            cmd.cwd(home);
        }

        let child = pair.slave.spawn_command(cmd)?;
        let writer = pair.master.take_writer()?;
        let mut reader = pair.master.try_clone_reader()?;
        let master: Box<dyn MasterPty + Send> = pair.master;

        let output_tx = self.channel(session);
        let reader_handle = tokio::task::spawn_blocking(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break, // EOF, shell exited
                    Ok(n) => {
                        // No receivers just means the chunk is dropped;
                        // keep draining so the PTY never backs up.
                        let _ = output_tx.send(buf[..n].to_vec());
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(PtySession {
            writer: Arc::new(Mutex::new(writer)),
            master,
            child,
            _reader_handle: reader_handle,
        })
    }
}

#[async_trait]
impl HostBridge for PtyHost {
    async fn connect(&self, session: &SessionId, params: &ConnectionParams) -> Result<()> {
        if params.server.provider == AuthProvider::Quick {
            let has_secret = params
                .secret
                .as_ref()
                .map(|s| !s.expose_secret().is_empty())
                .unwrap_or(false);
            if !has_secret {
                return Err(AppError::Host(format!(
                    "Auth Failed: missing credential for {}",
                    params.server.name
                )));
            }
        }

        let entry = self
            .spawn_shell(session, params)
            .map_err(|e| AppError::Host(format!("Shell Connection Failed: {e}")))?;

        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut old) = sessions.insert(session.as_str().to_string(), entry) {
            // Reconnect replaces the previous shell for this id.
            old.shutdown();
        }
        debug!(session = %session, server = %params.server.name, "session connected");
        Ok(())
    }

    async fn resize(&self, session: &SessionId, rows: u16, cols: u16) -> Result<()> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let entry = sessions
            .get(session.as_str())
            .ok_or_else(|| AppError::Host(format!("resize: unknown session {session}")))?;
        entry
            .master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| AppError::Host(format!("resize: {e}")))
    }

    async fn write_input(&self, session: &SessionId, data: &str) -> Result<()> {
        let writer = {
            let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions
                .get(session.as_str())
                .ok_or_else(|| AppError::Host(format!("write: unknown session {session}")))?
                .writer
                .clone()
        };
        let mut writer = writer
            .lock()
            .map_err(|e| AppError::Host(format!("write: {e}")))?;
        writer.write_all(data.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    async fn disconnect(&self, session: &SessionId) -> Result<()> {
        let removed = {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.remove(session.as_str())
        };
        if let Some(mut entry) = removed {
            entry.shutdown();
            debug!(session = %session, "session disconnected");
        }
        Ok(())
    }

    async fn record_history(&self, server_id: &str, command: &str, source: &str) -> Result<()> {
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.record(server_id, command, source);
        Ok(())
    }

    async fn search_history(
        &self,
        server_id: Option<&str>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<HistoryMatch>> {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        Ok(history.search(server_id, query, limit))
    }

    fn subscribe_output(&self, session: &SessionId) -> OutputEvents {
        self.channel(session).subscribe()
    }
}
