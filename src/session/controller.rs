//! Connection lifecycle for sessions.
//!
//! Status flow is `idle → connecting → connected`, with `connecting →
//! error` on structural failures and any state `→ disconnected` on
//! teardown. All host calls run in spawned tasks that report back through
//! the event channel, so the state machine itself never awaits.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::autocomplete::AutocompleteState;
use crate::bridge::{LineTracker, StreamBridge};
use crate::error::AppError;
use crate::event::Event;
use crate::host::{ConnectionParams, HostBridge};
use crate::session::credentials::CredentialVault;
use crate::session::{AuthProvider, ServerRef, SessionId, SessionStatus};
use crate::terminal::{SessionTerminal, TermView};
use crate::viewport::{fit_viewport, DebounceTimer, ResizeNegotiator};

/// Written into the terminal when a quick connection's one-shot lease
/// was already used or timed out.
pub const EXPIRED_BANNER: &str = "\r\n\x1b[33m[Auth]\x1b[0m Session expired.\r\n";

fn connecting_banner(name: &str) -> String {
    format!("\r\n\x1b[90mConnecting to {name}...\x1b[0m\r\n")
}

fn auth_banner(detail: &str) -> String {
    format!("\r\n\x1b[33m[Auth]\x1b[0m {detail}\r\n")
}

fn error_banner(detail: &str) -> String {
    format!("\r\n\x1b[31mConnection failed: {detail}\x1b[0m\r\n")
}

/// Everything one pane owns: connection state, the emulator, overlay
/// state and the timers driving debounced work.
pub struct Session {
    pub server: ServerRef,
    pub status: SessionStatus,
    pub negotiator: ResizeNegotiator,
    pub bridge: Option<StreamBridge>,
    pub terminal: SessionTerminal,
    pub autocomplete: AutocompleteState,
    pub tracker: LineTracker,
    pub resize_timer: DebounceTimer,
    pub search_timer: DebounceTimer,
    /// The quick-connect lease was gone at connect time.
    pub expired: bool,
    /// The user must be asked for a credential before the next attempt.
    pub wants_credential: bool,
    /// Last structural connect failure, shown in the status bar.
    pub error: Option<String>,
}

impl Session {
    pub fn new(server: ServerRef, terminal: SessionTerminal) -> Self {
        Self {
            server,
            status: SessionStatus::Idle,
            negotiator: ResizeNegotiator::new(),
            bridge: None,
            terminal,
            autocomplete: AutocompleteState::new(),
            tracker: LineTracker::new(),
            resize_timer: DebounceTimer::new(),
            search_timer: DebounceTimer::new(),
            expired: false,
            wants_credential: false,
            error: None,
        }
    }
}

/// Drives status transitions and owns the credential vault.
pub struct SessionController {
    host: Arc<dyn HostBridge>,
    events: mpsc::UnboundedSender<Event>,
    vault: CredentialVault,
    settle_delay: Duration,
}

impl SessionController {
    pub fn new(
        host: Arc<dyn HostBridge>,
        events: mpsc::UnboundedSender<Event>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            host,
            events,
            vault: CredentialVault::default(),
            settle_delay,
        }
    }

    pub fn vault_mut(&mut self) -> &mut CredentialVault {
        &mut self.vault
    }

    /// Begin a connect attempt. Quick servers without an explicit
    /// credential draw one from the vault; an empty vault means the
    /// session expired and the user is prompted instead of the host
    /// being called. At most one attempt runs per session.
    pub fn connect(
        &mut self,
        id: &SessionId,
        session: &mut Session,
        credential: Option<SecretString>,
    ) {
        match session.status {
            SessionStatus::Connecting | SessionStatus::Connected => {
                debug!(session = %id, status = session.status.label(), "connect ignored");
                return;
            }
            _ => {}
        }

        let params = match credential {
            Some(secret) => ConnectionParams::with_secret(session.server.clone(), secret),
            None if session.server.provider == AuthProvider::Quick => {
                match self.vault.consume(&session.server.id) {
                    Some(secret) => ConnectionParams::with_secret(session.server.clone(), secret),
                    None => {
                        info!(session = %id, server = %session.server.name, "credential lease gone");
                        session.status = SessionStatus::Disconnected;
                        session.expired = true;
                        session.wants_credential = true;
                        session.negotiator.set_ready(false);
                        session.terminal.process_bytes(EXPIRED_BANNER.as_bytes());
                        return;
                    }
                }
            }
            None => ConnectionParams::saved(session.server.clone()),
        };

        info!(session = %id, server = %session.server.name, "connecting");
        session.status = SessionStatus::Connecting;
        session.error = None;
        session.wants_credential = false;
        session
            .terminal
            .process_bytes(connecting_banner(&session.server.name).as_bytes());

        // Subscribe before the connect command goes out so the first
        // output bytes cannot be missed.
        if session.bridge.is_none() {
            session.bridge = Some(StreamBridge::open(
                id.clone(),
                self.host.clone(),
                self.events.clone(),
            ));
        }

        let host = self.host.clone();
        let events = self.events.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            let result = host.connect(&task_id, &params).await;
            let _ = events.send(Event::ConnectFinished {
                session: task_id,
                result,
            });
        });
    }

    /// Re-enter connect with an explicit credential, clearing the
    /// expired marker first.
    pub fn reconnect(&mut self, id: &SessionId, session: &mut Session, secret: SecretString) {
        if session.status == SessionStatus::Connecting {
            debug!(session = %id, "reconnect ignored, attempt in flight");
            return;
        }
        session.expired = false;
        if session.status == SessionStatus::Connected {
            session.status = SessionStatus::Disconnected;
            session.negotiator.set_ready(false);
        }
        self.connect(id, session, Some(secret));
    }

    /// Apply a finished connect attempt.
    pub fn finish_connect(
        &self,
        id: &SessionId,
        session: &mut Session,
        result: crate::error::Result<()>,
    ) {
        match result {
            Ok(()) => {
                info!(session = %id, server = %session.server.name, "connected");
                session.status = SessionStatus::Connected;
                session.expired = false;
                let events = self.events.clone();
                let settle_id = id.clone();
                let delay = self.settle_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = events.send(Event::ConnectSettled { session: settle_id });
                });
            }
            Err(err) => self.fail_connect(id, session, &err),
        }
    }

    fn fail_connect(&self, id: &SessionId, session: &mut Session, err: &AppError) {
        session.negotiator.set_ready(false);
        let detail = err.detail();
        if err.is_auth_failure() {
            info!(session = %id, %detail, "connect rejected, credential needed");
            session.status = SessionStatus::Disconnected;
            session.wants_credential = true;
            session.terminal.process_bytes(auth_banner(&detail).as_bytes());
        } else {
            warn!(session = %id, %detail, "connect failed");
            session.status = SessionStatus::Error;
            session.error = Some(detail.clone());
            session
                .terminal
                .process_bytes(error_banner(&detail).as_bytes());
        }
    }

    /// The settle delay after a successful connect elapsed: the session
    /// becomes ready and the current viewport is pushed once, forced.
    pub fn settle(&self, id: &SessionId, session: &mut Session) {
        if session.status != SessionStatus::Connected {
            debug!(session = %id, "settle ignored, no longer connected");
            return;
        }
        debug!(session = %id, "session settled");
        session.negotiator.set_ready(true);
        self.push_resize(id, session, true);
    }

    /// Fit the current viewport and transmit it if the negotiator lets
    /// it through. The host call runs detached; failures are logged and
    /// the bookkeeping stands.
    pub fn push_resize(&self, id: &SessionId, session: &mut Session, force: bool) {
        let fitted = fit_viewport(
            session.terminal.container_rect(),
            session.terminal.cell_metrics(),
            session.terminal.padding(),
        );
        let Some(size) = session.negotiator.negotiate(fitted, force) else {
            return;
        };
        debug!(session = %id, %size, force, "sending resize");
        let host = self.host.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            if let Err(err) = host.resize(&task_id, size.rows, size.cols).await {
                warn!(session = %task_id, %size, %err, "resize failed");
            }
        });
    }

    /// Release the session after its last tab closed. Listeners are
    /// detached before the disconnect command goes out, so late output
    /// cannot reach a dead pane. The disconnect itself is fire-and-forget.
    pub fn teardown(&self, id: &SessionId, session: &mut Session) {
        info!(session = %id, server = %session.server.name, "tearing down");
        session.negotiator.set_ready(false);
        session.resize_timer.cancel();
        session.search_timer.cancel();
        session.autocomplete.reset();
        session.tracker.clear();
        if let Some(bridge) = session.bridge.take() {
            bridge.detach();
        }
        session.status = SessionStatus::Disconnected;

        let host = self.host.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            if let Err(err) = host.disconnect(&task_id).await {
                warn!(session = %task_id, %err, "disconnect failed during teardown");
            }
        });
    }
}
