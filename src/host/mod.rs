//! Session host boundary: the command/event interface every session runs
//! against.
//!
//! The host exposes a request/response command surface (connect, resize,
//! write, disconnect, history) and a per-session output event stream. The
//! controller code only ever talks to [`HostBridge`]; the production
//! implementation in [`pty`] drives local pseudo-terminals.

pub mod history;
pub mod pty;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::session::{ServerRef, SessionId};

/// Raw output chunks for one session, in send order.
pub type OutputEvents = broadcast::Receiver<Vec<u8>>;

/// Channel capacity for per-session output streams.
pub const OUTPUT_CHANNEL_CAPACITY: usize = 256;

/// Everything needed to open one remote shell.
#[derive(Clone)]
pub struct ConnectionParams {
    pub server: ServerRef,
    /// Present for quick connections; resolved by the credential gate
    /// before the host is called.
    pub secret: Option<SecretString>,
}

impl ConnectionParams {
    pub fn saved(server: ServerRef) -> Self {
        Self {
            server,
            secret: None,
        }
    }

    pub fn with_secret(server: ServerRef, secret: SecretString) -> Self {
        Self {
            server,
            secret: Some(secret),
        }
    }
}

/// One command-history search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMatch {
    pub command: String,
    pub exec_count: u64,
}

/// The host process boundary.
///
/// Every method is independently awaitable; callers decide which failures
/// are surfaced and which are logged and swallowed.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Open the remote shell for `session`. Errors starting with
    /// `"Auth Failed"` (or containing `"denied"`) mark credential problems;
    /// everything else is structural.
    async fn connect(&self, session: &SessionId, params: &ConnectionParams) -> Result<()>;

    /// Propagate a new viewport size to the remote side.
    async fn resize(&self, session: &SessionId, rows: u16, cols: u16) -> Result<()>;

    /// Write raw input bytes to the remote shell.
    async fn write_input(&self, session: &SessionId, data: &str) -> Result<()>;

    /// Close the session. Best-effort; callers ignore the result beyond
    /// logging.
    async fn disconnect(&self, session: &SessionId) -> Result<()>;

    /// Persist one executed command line. Best-effort.
    async fn record_history(&self, server_id: &str, command: &str, source: &str) -> Result<()>;

    /// Prefix search over recorded commands, most frequent first.
    /// Best-effort; failures come back as errors the caller maps to empty.
    async fn search_history(
        &self,
        server_id: Option<&str>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<HistoryMatch>>;

    /// Subscribe to the session's output stream. Must be callable before
    /// `connect` so no early output is lost; receivers outlive disconnect
    /// and simply run dry.
    fn subscribe_output(&self, session: &SessionId) -> OutputEvents;
}
