//! Session domain types: ids, status, server references, viewport sizes.

pub mod controller;
pub mod credentials;
pub mod registry;

use std::fmt;

use uuid::Uuid;

use crate::config::ServerConfig;

/// Opaque session identifier, stable for the lifetime of one pane.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Connecting,
    Connected,
    Error,
    Disconnected,
}

impl SessionStatus {
    /// Status-bar label.
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Error => "error",
            SessionStatus::Disconnected => "disconnected",
        }
    }
}

/// How a server authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProvider {
    /// Connection parameters are complete as stored.
    Saved,
    /// A password must be supplied at connect time and is held as a
    /// one-shot lease.
    Quick,
}

/// Resolved connection parameters for one server entry.
#[derive(Debug, Clone)]
pub struct ServerRef {
    /// Stable key used for history records and credential leases.
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub provider: AuthProvider,
    /// Shell command override for locally hosted sessions.
    pub command: Option<String>,
}

impl ServerRef {
    /// Build a `ServerRef` from a `[[servers]]` config entry.
    pub fn from_config(cfg: &ServerConfig) -> Self {
        Self {
            id: cfg.name.clone(),
            name: cfg.name.clone(),
            host: cfg.host.clone().unwrap_or_else(|| "localhost".to_string()),
            port: cfg.port.unwrap_or(22),
            username: cfg.username.clone(),
            provider: if cfg.is_quick() {
                AuthProvider::Quick
            } else {
                AuthProvider::Saved
            },
            command: cfg.command.clone(),
        }
    }

    /// A local fallback entry used when no server is configured.
    pub fn local() -> Self {
        Self {
            id: "local".to_string(),
            name: "local".to_string(),
            host: "localhost".to_string(),
            port: 22,
            username: None,
            provider: AuthProvider::Saved,
            command: None,
        }
    }
}

/// A terminal viewport size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeSpec {
    pub cols: u16,
    pub rows: u16,
}

impl SizeSpec {
    /// The "never sent" sentinel every session starts from.
    pub const ZERO: SizeSpec = SizeSpec { cols: 0, rows: 0 };

    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}
