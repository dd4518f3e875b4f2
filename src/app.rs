use std::collections::HashMap;
use std::sync::Arc;

use ratatui::layout::Rect;
use secrecy::SecretString;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::autocomplete::snippets::SnippetStore;
use crate::autocomplete::{merge_suggestions, FeedOutcome, HISTORY_SLOTS, SNIPPET_SLOTS};
use crate::config::AppConfig;
use crate::event::Event;
use crate::host::HostBridge;
use crate::session::controller::{Session, SessionController};
use crate::session::registry::SessionRegistry;
use crate::session::{AuthProvider, ServerRef, SessionId, SessionStatus};
use crate::terminal::{CellMetrics, SessionTerminal};
use crate::theme::{resolve_theme, ThemeColors};

/// Most panes a tab can hold side by side.
pub const PANES_PER_TAB: usize = 2;

/// One tab: up to two panes, each backed by its own session.
#[derive(Debug)]
pub struct Tab {
    pub panes: Vec<SessionId>,
    pub active_pane: usize,
}

impl Tab {
    pub fn new(session: SessionId) -> Self {
        Self {
            panes: vec![session],
            active_pane: 0,
        }
    }
}

/// State for the re-authentication prompt.
#[derive(Debug)]
pub struct AuthPrompt {
    pub session: SessionId,
    pub server: String,
    pub input: String,
    pub expired: bool,
}

/// Main application state.
pub struct App {
    pub config: AppConfig,
    pub theme: ThemeColors,
    pub controller: SessionController,
    pub registry: SessionRegistry,
    pub sessions: HashMap<SessionId, Session>,
    pub tabs: Vec<Tab>,
    pub active_tab: usize,
    pub auth_prompt: Option<AuthPrompt>,
    pub should_quit: bool,
    /// Frame counter advanced on `Tick`, drives the connecting spinner.
    pub ticks: usize,
    /// Screen rectangles of the visible panes, refreshed each draw.
    pub pane_areas: Vec<(SessionId, Rect)>,
    host: Arc<dyn HostBridge>,
    snippets: Arc<SnippetStore>,
    events: mpsc::UnboundedSender<Event>,
    default_server: ServerRef,
    /// Panes revealed by a tab switch; they get one unconditional size
    /// push after the next layout pass has measured them.
    pending_forced: Vec<SessionId>,
}

impl App {
    /// Create the app with one tab connected to `server`.
    pub fn new(
        config: AppConfig,
        host: Arc<dyn HostBridge>,
        events: mpsc::UnboundedSender<Event>,
        server: ServerRef,
    ) -> Self {
        let theme = resolve_theme(&config.theme);
        let snippets = load_snippets(&config);
        let controller =
            SessionController::new(host.clone(), events.clone(), config.settle_delay());
        let mut app = Self {
            config,
            theme,
            controller,
            registry: SessionRegistry::new(),
            sessions: HashMap::new(),
            tabs: Vec::new(),
            active_tab: 0,
            auth_prompt: None,
            should_quit: false,
            ticks: 0,
            pane_areas: Vec::new(),
            host,
            snippets: Arc::new(snippets),
            events,
            default_server: server.clone(),
            pending_forced: Vec::new(),
        };
        let id = app.open_session(server);
        app.tabs.push(Tab::new(id));
        app
    }

    /// Register a fresh session and start its connect attempt.
    pub fn open_session(&mut self, server: ServerRef) -> SessionId {
        let id = SessionId::new();
        let mut session = Session::new(server, self.new_session_terminal());
        self.registry.register(&id);
        self.controller.connect(&id, &mut session, None);
        self.sessions.insert(id.clone(), session);
        self.sync_prompt(&id);
        id
    }

    fn new_session_terminal(&self) -> SessionTerminal {
        SessionTerminal::new(
            24,
            80,
            self.config.scrollback_lines(),
            CellMetrics {
                width: self.config.cell_width_px(),
                height: self.config.cell_height_px(),
            },
            self.config.padding_px(),
        )
    }

    /// Session id of the focused pane, if any.
    pub fn focused_session_id(&self) -> Option<SessionId> {
        let tab = self.tabs.get(self.active_tab)?;
        tab.panes.get(tab.active_pane).cloned()
    }

    /// Open a new tab against the default server and switch to it.
    pub fn new_tab(&mut self) {
        let server = self.default_server.clone();
        let id = self.open_session(server);
        self.tabs.push(Tab::new(id));
        let last = self.tabs.len() - 1;
        self.activate_tab(last);
    }

    /// Split the current tab, opening a second session to the focused
    /// pane's server.
    pub fn split_pane(&mut self) {
        let Some(tab) = self.tabs.get(self.active_tab) else {
            return;
        };
        if tab.panes.len() >= PANES_PER_TAB {
            return;
        }
        let server = self
            .focused_session_id()
            .and_then(|id| self.sessions.get(&id))
            .map(|session| session.server.clone())
            .unwrap_or_else(|| self.default_server.clone());
        let id = self.open_session(server);
        let tab = &mut self.tabs[self.active_tab];
        tab.panes.push(id);
        tab.active_pane = tab.panes.len() - 1;
    }

    /// Close the focused pane, tearing its session down once nothing
    /// references it. Closing the last pane of the last tab quits.
    pub fn close_pane(&mut self) {
        let Some(id) = self.focused_session_id() else {
            return;
        };
        {
            let tab = &mut self.tabs[self.active_tab];
            tab.panes.retain(|pane| pane != &id);
            if tab.active_pane >= tab.panes.len() {
                tab.active_pane = tab.panes.len().saturating_sub(1);
            }
        }
        self.release_session(&id);
        if self.tabs[self.active_tab].panes.is_empty() {
            self.tabs.remove(self.active_tab);
            if self.active_tab >= self.tabs.len() {
                self.active_tab = self.tabs.len().saturating_sub(1);
            }
            if self.tabs.is_empty() {
                self.should_quit = true;
            } else {
                self.mark_active_tab_revealed();
            }
        }
    }

    fn release_session(&mut self, id: &SessionId) {
        if !self.registry.unregister(id) {
            return;
        }
        if let Some(mut session) = self.sessions.remove(id) {
            self.controller.teardown(id, &mut session);
        }
    }

    /// Switch to the tab at `index`.
    pub fn activate_tab(&mut self, index: usize) {
        if index >= self.tabs.len() || index == self.active_tab {
            return;
        }
        for id in &self.tabs[self.active_tab].panes {
            if let Some(session) = self.sessions.get_mut(id) {
                session.terminal.mark_hidden();
            }
        }
        self.active_tab = index;
        self.mark_active_tab_revealed();
    }

    fn mark_active_tab_revealed(&mut self) {
        let panes = self.tabs[self.active_tab].panes.clone();
        self.pending_forced.extend(panes);
    }

    pub fn next_tab(&mut self) {
        if self.tabs.len() > 1 {
            let next = (self.active_tab + 1) % self.tabs.len();
            self.activate_tab(next);
        }
    }

    pub fn prev_tab(&mut self) {
        if self.tabs.len() > 1 {
            let prev = (self.active_tab + self.tabs.len() - 1) % self.tabs.len();
            self.activate_tab(prev);
        }
    }

    /// Cycle focus between the panes of the current tab.
    pub fn focus_next_pane(&mut self) {
        if let Some(tab) = self.tabs.get_mut(self.active_tab) {
            if tab.panes.len() > 1 {
                tab.active_pane = (tab.active_pane + 1) % tab.panes.len();
            }
        }
    }

    /// Focus the pane under a mouse click, if any.
    pub fn focus_pane_at(&mut self, column: u16, row: u16) {
        let hit = self.pane_areas.iter().find(|(_, area)| {
            column >= area.x
                && column < area.x + area.width
                && row >= area.y
                && row < area.y + area.height
        });
        let Some((id, _)) = hit else {
            return;
        };
        let id = id.clone();
        if let Some(tab) = self.tabs.get_mut(self.active_tab) {
            if let Some(position) = tab.panes.iter().position(|pane| pane == &id) {
                tab.active_pane = position;
            }
        }
    }

    /// Route one completed async operation back into session state.
    pub fn dispatch(&mut self, event: Event) {
        match event {
            Event::ConnectFinished { session, result } => {
                if let Some(state) = self.sessions.get_mut(&session) {
                    self.controller.finish_connect(&session, state, result);
                }
                self.sync_prompt(&session);
            }
            Event::ConnectSettled { session } => {
                if let Some(state) = self.sessions.get_mut(&session) {
                    self.controller.settle(&session, state);
                }
            }
            Event::SessionOutput { session, bytes } => {
                if let Some(state) = self.sessions.get_mut(&session) {
                    let before = state.terminal.emulator.scrollback_len();
                    state.terminal.process_bytes(&bytes);
                    if state.terminal.scroll_offset > 0 {
                        // Keep the viewed slice of scrollback in place while
                        // new output lands below it.
                        let grown = state.terminal.emulator.scrollback_len() - before;
                        state.terminal.scroll_offset = (state.terminal.scroll_offset + grown)
                            .min(state.terminal.emulator.scrollback_len());
                    }
                }
            }
            Event::SuggestionsReady {
                session,
                query,
                items,
            } => {
                if let Some(state) = self.sessions.get_mut(&session) {
                    state.autocomplete.accept_results(&query, items);
                }
            }
            Event::ViewportSettled { session } => {
                if let Some(state) = self.sessions.get_mut(&session) {
                    self.controller.push_resize(&session, state, false);
                }
            }
            Event::Tick => self.ticks = self.ticks.wrapping_add(1),
            Event::Key(_) | Event::Mouse(_) | Event::Resize(_, _) => {}
        }
    }

    /// Raise the re-auth prompt when a session asked for a credential
    /// and no prompt is already up.
    fn sync_prompt(&mut self, id: &SessionId) {
        if self.auth_prompt.is_some() {
            return;
        }
        let Some(session) = self.sessions.get(id) else {
            return;
        };
        if session.wants_credential {
            self.auth_prompt = Some(AuthPrompt {
                session: id.clone(),
                server: session.server.name.clone(),
                input: String::new(),
                expired: session.expired,
            });
        }
    }

    /// Submit the typed credential and reconnect.
    pub fn submit_auth(&mut self) {
        let Some(prompt) = self.auth_prompt.take() else {
            return;
        };
        let secret = SecretString::new(prompt.input);
        if let Some(session) = self.sessions.get_mut(&prompt.session) {
            self.controller.reconnect(&prompt.session, session, secret);
        }
    }

    /// Dismiss the prompt without connecting.
    pub fn cancel_auth(&mut self) {
        if let Some(prompt) = self.auth_prompt.take() {
            if let Some(session) = self.sessions.get_mut(&prompt.session) {
                session.wants_credential = false;
            }
        }
    }

    /// Re-drive a dead focused session: prompt again for quick servers,
    /// plain reconnect otherwise. Returns false when the session is live.
    pub fn retry_focused(&mut self) -> bool {
        let Some(id) = self.focused_session_id() else {
            return false;
        };
        let Some(session) = self.sessions.get_mut(&id) else {
            return false;
        };
        match session.status {
            SessionStatus::Disconnected | SessionStatus::Error => {}
            _ => return false,
        }
        if session.server.provider == AuthProvider::Quick {
            session.wants_credential = true;
            self.sync_prompt(&id);
        } else {
            self.controller.connect(&id, session, None);
        }
        true
    }

    /// Forward raw input to the focused session and run the input
    /// mirrors (history line tracker, autocomplete buffer) over it.
    pub fn send_keys(&mut self, data: &str) {
        let Some(id) = self.focused_session_id() else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        session.terminal.scroll_offset = 0;
        if session.status != SessionStatus::Connected {
            return;
        }
        if let Some(bridge) = &session.bridge {
            bridge.send_input(data);
        }
        if let Some(line) = session.tracker.feed(data) {
            if self.config.history_enabled() {
                let host = self.host.clone();
                let server = session.server.id.clone();
                tokio::spawn(async move {
                    if let Err(err) = host.record_history(&server, &line, "input").await {
                        debug!(%err, "history record failed");
                    }
                });
            }
        }
        match session.autocomplete.feed(data) {
            FeedOutcome::Search(query) => {
                let host = self.host.clone();
                let snippets = self.snippets.clone();
                let events = self.events.clone();
                let server = session.server.id.clone();
                let task_id = id.clone();
                session
                    .search_timer
                    .arm(self.config.search_debounce(), move || {
                        spawn_suggestion_lookup(host, snippets, events, task_id, server, query);
                    });
            }
            FeedOutcome::Dismiss => session.search_timer.cancel(),
            FeedOutcome::Idle => {}
        }
    }

    /// Apply the selected suggestion: send the completion bytes and
    /// mirror them into the history tracker the way they land remotely.
    pub fn apply_suggestion(&mut self) {
        let Some(id) = self.focused_session_id() else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        let Some(outgoing) = session.autocomplete.apply() else {
            return;
        };
        session.search_timer.cancel();
        if let Some(bridge) = &session.bridge {
            bridge.send_input(outgoing.clone());
        }
        let mut rest = outgoing.as_str();
        while let Some(stripped) = rest.strip_prefix('\x7f') {
            session.tracker.feed("\x7f");
            rest = stripped;
        }
        if !rest.is_empty() {
            session.tracker.feed(rest);
        }
    }

    /// Scroll the focused pane's view; positive deltas go further back.
    pub fn scroll_focused(&mut self, delta: isize) {
        let Some(id) = self.focused_session_id() else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        let max = session.terminal.emulator.scrollback_len() as isize;
        let next = session.terminal.scroll_offset as isize + delta;
        session.terminal.scroll_offset = next.clamp(0, max) as usize;
    }

    /// Scroll by roughly one screen of the focused pane.
    pub fn scroll_page(&mut self, direction: isize) {
        let page = self
            .focused_session_id()
            .and_then(|id| self.sessions.get(&id))
            .map(|session| session.terminal.emulator.rows().saturating_sub(1).max(1))
            .unwrap_or(1) as isize;
        self.scroll_focused(page * direction);
    }

    /// Sync a visible pane's measured layout into its session and stage
    /// a debounced size push when the grid dimensions changed.
    pub fn sync_viewport(&mut self, id: &SessionId, inner: Rect) {
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        session.terminal.sync_layout(inner);
        if inner.width == 0 || inner.height == 0 {
            return;
        }
        let emulator = &session.terminal.emulator;
        if emulator.cols() == inner.width as usize && emulator.rows() == inner.height as usize {
            return;
        }
        session.terminal.resize_grid(inner.width, inner.height);
        let events = self.events.clone();
        let task_id = id.clone();
        session
            .resize_timer
            .arm(self.config.resize_debounce(), move || {
                let _ = events.send(Event::ViewportSettled { session: task_id });
            });
    }

    /// Push sizes for panes a tab switch just revealed. Runs after the
    /// layout pass so the fitter sees real measurements.
    pub fn flush_pending_forced(&mut self) {
        let pending = std::mem::take(&mut self.pending_forced);
        for id in pending {
            if let Some(session) = self.sessions.get_mut(&id) {
                if session.status == SessionStatus::Connected {
                    self.controller.push_resize(&id, session, true);
                }
            }
        }
    }

    /// Tear down every session and quit.
    pub fn quit(&mut self) {
        let ids: Vec<SessionId> = self.sessions.keys().cloned().collect();
        for id in ids {
            if let Some(mut session) = self.sessions.remove(&id) {
                self.controller.teardown(&id, &mut session);
            }
        }
        self.should_quit = true;
    }
}

fn load_snippets(config: &AppConfig) -> SnippetStore {
    match config.snippets_path() {
        Some(path) => match SnippetStore::load(&path) {
            Ok(store) => store,
            Err(err) => {
                warn!(%err, path = %path.display(), "snippet library unavailable");
                SnippetStore::new(Vec::new())
            }
        },
        None => SnippetStore::new(Vec::new()),
    }
}

fn spawn_suggestion_lookup(
    host: Arc<dyn HostBridge>,
    snippets: Arc<SnippetStore>,
    events: mpsc::UnboundedSender<Event>,
    session: SessionId,
    server_id: String,
    query: String,
) {
    tokio::spawn(async move {
        let history = match host
            .search_history(Some(&server_id), &query, HISTORY_SLOTS)
            .await
        {
            Ok(matches) => matches,
            Err(err) => {
                debug!(%err, "history lookup failed");
                Vec::new()
            }
        };
        let snippet_hits = snippets.search_shell(&query, SNIPPET_SLOTS);
        let items = merge_suggestions(&history, &snippet_hits);
        let _ = events.send(Event::SuggestionsReady {
            session,
            query,
            items,
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;

    use crate::host::HistoryMatch;
    use crate::test_support::{HostCall, RecordingHost};

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.timing.settle_delay_ms = Some(5);
        config.timing.resize_debounce_ms = Some(5);
        config.timing.search_debounce_ms = Some(5);
        config.history.enabled = Some(true);
        config.snippets.path = Some("/nonexistent/snippets.json".into());
        config
    }

    fn quick_server() -> ServerRef {
        ServerRef {
            id: "srv-quick".into(),
            name: "jump".into(),
            host: "jump.internal".into(),
            port: 22,
            username: Some("ops".into()),
            provider: AuthProvider::Quick,
            command: None,
        }
    }

    fn new_app(host: Arc<RecordingHost>, server: ServerRef) -> (App, UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(test_config(), host, tx, server);
        (app, rx)
    }

    /// Pump queued events into the app until `done` holds.
    async fn wait_for(
        app: &mut App,
        rx: &mut UnboundedReceiver<Event>,
        mut done: impl FnMut(&App) -> bool,
    ) {
        for _ in 0..100 {
            if done(app) {
                return;
            }
            match timeout(Duration::from_millis(20), rx.recv()).await {
                Ok(Some(event)) => app.dispatch(event),
                Ok(None) => panic!("event channel closed"),
                Err(_) => {}
            }
        }
        panic!("condition not reached in time");
    }

    fn has_status(app: &App, id: &SessionId, status: SessionStatus) -> bool {
        app.sessions.get(id).map(|s| s.status) == Some(status)
    }

    #[tokio::test]
    async fn startup_opens_one_connected_session() {
        let host = Arc::new(RecordingHost::new());
        let (mut app, mut rx) = new_app(host.clone(), ServerRef::local());
        assert_eq!(app.tabs.len(), 1);
        assert_eq!(app.sessions.len(), 1);
        let id = app.focused_session_id().unwrap();
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &id, SessionStatus::Connected)
        })
        .await;
        assert_eq!(host.connect_count(), 1);
    }

    #[tokio::test]
    async fn split_creates_a_second_session_in_the_tab() {
        let host = Arc::new(RecordingHost::new());
        let (mut app, mut rx) = new_app(host.clone(), ServerRef::local());
        let first = app.focused_session_id().unwrap();
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &first, SessionStatus::Connected)
        })
        .await;

        app.split_pane();
        assert_eq!(app.sessions.len(), 2);
        assert_eq!(app.tabs[0].panes.len(), 2);
        assert_eq!(app.tabs[0].active_pane, 1);
        let second = app.focused_session_id().unwrap();
        assert_ne!(first, second);
        assert_eq!(app.registry.reference_count(&second), 1);

        // a third split is refused
        app.split_pane();
        assert_eq!(app.tabs[0].panes.len(), 2);
    }

    #[tokio::test]
    async fn closing_the_last_pane_quits_and_tears_down() {
        let host = Arc::new(RecordingHost::new());
        let (mut app, mut rx) = new_app(host.clone(), ServerRef::local());
        let id = app.focused_session_id().unwrap();
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &id, SessionStatus::Connected)
        })
        .await;

        app.close_pane();
        assert!(app.should_quit);
        assert!(app.sessions.is_empty());
        assert!(app.tabs.is_empty());
    }

    #[tokio::test]
    async fn quick_server_without_a_lease_prompts_before_any_host_call() {
        let host = Arc::new(RecordingHost::new());
        let (app, _rx) = new_app(host.clone(), quick_server());
        let prompt = app.auth_prompt.as_ref().expect("prompt raised");
        assert!(prompt.expired);
        assert_eq!(prompt.server, "jump");
        assert_eq!(host.connect_count(), 0);
    }

    #[tokio::test]
    async fn submitting_the_prompt_reconnects_with_the_typed_secret() {
        let host = Arc::new(RecordingHost::new());
        let (mut app, mut rx) = new_app(host.clone(), quick_server());
        let id = app.focused_session_id().unwrap();

        app.auth_prompt.as_mut().unwrap().input.push_str("hunter2");
        app.submit_auth();
        assert!(app.auth_prompt.is_none());
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &id, SessionStatus::Connected)
        })
        .await;
        assert_eq!(host.connect_count(), 1);
        assert!(!app.sessions[&id].expired);
    }

    #[tokio::test]
    async fn typed_keys_reach_the_host_in_order() {
        let host = Arc::new(RecordingHost::new());
        let (mut app, mut rx) = new_app(host.clone(), ServerRef::local());
        let id = app.focused_session_id().unwrap();
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &id, SessionStatus::Connected)
        })
        .await;

        for chunk in ["e", "c", "h", "o", "\r"] {
            app.send_keys(chunk);
        }
        wait_for(&mut app, &mut rx, |_| host.written(&id).len() == 5).await;
        assert_eq!(host.written(&id), vec!["e", "c", "h", "o", "\r"]);
    }

    #[tokio::test]
    async fn suggestions_round_trip_through_the_debounce() {
        let host = Arc::new(RecordingHost::new());
        host.set_search_results(vec![HistoryMatch {
            command: "git status".into(),
            exec_count: 4,
        }]);
        let (mut app, mut rx) = new_app(host.clone(), ServerRef::local());
        let id = app.focused_session_id().unwrap();
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &id, SessionStatus::Connected)
        })
        .await;

        app.send_keys("g");
        app.send_keys("i");
        app.send_keys("t");
        wait_for(&mut app, &mut rx, |app| {
            app.sessions[&id].autocomplete.is_visible()
        })
        .await;
        assert_eq!(app.sessions[&id].autocomplete.items()[0].value, "git status");

        // the per-key re-arms collapsed into one lookup for the final query
        let lookups: Vec<_> = host
            .calls()
            .iter()
            .filter(|call| matches!(call, HostCall::SearchHistory { .. }))
            .cloned()
            .collect();
        assert_eq!(
            lookups,
            vec![HostCall::SearchHistory {
                server: Some("local".into()),
                query: "git".into(),
            }]
        );
    }

    #[tokio::test]
    async fn stale_suggestions_do_not_resurface() {
        let host = Arc::new(RecordingHost::new());
        host.set_search_results(vec![HistoryMatch {
            command: "git status".into(),
            exec_count: 4,
        }]);
        let (mut app, mut rx) = new_app(host.clone(), ServerRef::local());
        let id = app.focused_session_id().unwrap();
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &id, SessionStatus::Connected)
        })
        .await;

        app.send_keys("g");
        // hold the results back until the buffer has moved on
        let held = loop {
            let event = timeout(Duration::from_millis(500), rx.recv())
                .await
                .expect("suggestions within timeout")
                .expect("channel open");
            if matches!(event, Event::SuggestionsReady { .. }) {
                break event;
            }
            app.dispatch(event);
        };
        app.send_keys("x");
        app.dispatch(held);
        assert!(!app.sessions[&id].autocomplete.is_visible());
    }

    #[tokio::test]
    async fn tab_switch_forces_a_size_push_for_the_revealed_pane() {
        let host = Arc::new(RecordingHost::new());
        let (mut app, mut rx) = new_app(host.clone(), ServerRef::local());
        let first = app.focused_session_id().unwrap();
        app.sync_viewport(&first, Rect::new(0, 0, 80, 24));
        wait_for(&mut app, &mut rx, |_| host.resizes(&first).len() == 1).await;
        assert_eq!(host.resizes(&first), vec![(24, 80)]);

        app.new_tab();
        let second = app.focused_session_id().unwrap();
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &second, SessionStatus::Connected)
        })
        .await;

        app.activate_tab(0);
        app.sync_viewport(&first, Rect::new(0, 0, 100, 30));
        app.flush_pending_forced();
        wait_for(&mut app, &mut rx, |_| host.resizes(&first).len() == 2).await;
        assert_eq!(host.resizes(&first), vec![(24, 80), (30, 100)]);
    }

    #[tokio::test]
    async fn scrolled_view_stays_anchored_while_output_streams() {
        let host = Arc::new(RecordingHost::new());
        let (mut app, mut rx) = new_app(host.clone(), ServerRef::local());
        let id = app.focused_session_id().unwrap();
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &id, SessionStatus::Connected)
        })
        .await;

        app.dispatch(Event::SessionOutput {
            session: id.clone(),
            bytes: b"x\r\n".repeat(30),
        });
        assert!(app.sessions[&id].terminal.emulator.scrollback_len() > 3);

        app.scroll_focused(3);
        app.dispatch(Event::SessionOutput {
            session: id.clone(),
            bytes: b"y\r\n".repeat(5),
        });
        assert_eq!(app.sessions[&id].terminal.scroll_offset, 8);

        // typing snaps the view back to the live grid
        app.send_keys("q");
        assert_eq!(app.sessions[&id].terminal.scroll_offset, 0);
    }

    #[tokio::test]
    async fn enter_on_a_failed_session_retries() {
        let host = Arc::new(RecordingHost::new());
        host.fail_next_connect("Shell Connection Failed: refused");
        let (mut app, mut rx) = new_app(host.clone(), ServerRef::local());
        let id = app.focused_session_id().unwrap();
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &id, SessionStatus::Error)
        })
        .await;
        assert!(app.sessions[&id].error.is_some());

        assert!(app.retry_focused());
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &id, SessionStatus::Connected)
        })
        .await;
        assert_eq!(host.connect_count(), 2);
    }

    #[tokio::test]
    async fn applied_suggestions_feed_the_history_mirror() {
        let host = Arc::new(RecordingHost::new());
        let (mut app, mut rx) = new_app(host.clone(), ServerRef::local());
        let id = app.focused_session_id().unwrap();
        wait_for(&mut app, &mut rx, |app| {
            has_status(app, &id, SessionStatus::Connected)
        })
        .await;

        app.send_keys("git s");
        let session = app.sessions.get_mut(&id).unwrap();
        session.autocomplete.accept_results(
            "git s",
            vec![crate::autocomplete::SuggestionItem::history("git status")],
        );
        app.apply_suggestion();
        app.send_keys("\r");

        wait_for(&mut app, &mut rx, |_| !host.recorded_history().is_empty()).await;
        assert_eq!(
            host.recorded_history(),
            vec![(
                "local".to_string(),
                "git status".to_string(),
                "input".to_string()
            )]
        );
    }
}
