use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, BorderType, Borders},
    Frame,
};

use crate::app::App;
use crate::components::auth_prompt::AuthPromptWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::components::suggestions::SuggestionsOverlay;
use crate::components::tabs::{TabEntry, TabStripWidget};
use crate::components::terminal::TerminalWidget;
use crate::session::{SessionId, SessionStatus, SizeSpec};
use crate::terminal::TermView;

/// Render the application UI: tab strip, pane grid, status bar, then
/// the floating layers on top.
pub fn render(app: &mut App, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_tab_strip(app, frame, chunks[0]);
    render_panes(app, frame, chunks[1]);
    render_status_bar(app, frame, chunks[2]);

    // runs after the layout pass so revealed panes are measured
    app.flush_pending_forced();

    render_overlay(app, frame);
    render_auth_prompt(app, frame);
}

fn render_tab_strip(app: &App, frame: &mut Frame, area: Rect) {
    let entries: Vec<TabEntry> = app
        .tabs
        .iter()
        .map(|tab| {
            let (name, status) = tab
                .panes
                .first()
                .and_then(|id| app.sessions.get(id))
                .map(|session| (session.server.name.clone(), session.status))
                .unwrap_or_else(|| (String::from("?"), SessionStatus::Idle));
            TabEntry { name, status }
        })
        .collect();
    frame.render_widget(TabStripWidget::new(&entries, app.active_tab, &app.theme), area);
}

fn render_panes(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(tab) = app.tabs.get(app.active_tab) else {
        return;
    };
    let panes = tab.panes.clone();
    let focused = tab.active_pane;
    let columns = pane_columns(area, panes.len());

    let mut areas = Vec::with_capacity(panes.len());
    for (index, id) in panes.iter().enumerate() {
        let Some(pane_area) = columns.get(index).copied() else {
            break;
        };
        let Some(session) = app.sessions.get(id) else {
            continue;
        };
        let border = if index == focused {
            Style::default().fg(app.theme.border_focused_fg)
        } else {
            Style::default().fg(app.theme.border_fg)
        };
        let block = Block::default()
            .title(format!(" {} ", session.server.name))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border);
        let inner = block.inner(pane_area);
        frame.render_widget(block, pane_area);

        app.sync_viewport(id, inner);

        let Some(session) = app.sessions.get(id) else {
            continue;
        };
        let show_cursor = index == focused && session.status == SessionStatus::Connected;
        frame.render_widget(
            TerminalWidget::new(&session.terminal, &app.theme, show_cursor),
            inner,
        );
        areas.push((id.clone(), pane_area));
    }
    app.pane_areas = areas;
}

/// Split the pane region into equal columns.
fn pane_columns(area: Rect, count: usize) -> Vec<Rect> {
    match count {
        0 => Vec::new(),
        1 => vec![area],
        _ => Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area)
            .to_vec(),
    }
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let Some(id) = app.focused_session_id() else {
        return;
    };
    let Some(session) = app.sessions.get(&id) else {
        return;
    };
    let size = SizeSpec::new(
        session.terminal.emulator.cols() as u16,
        session.terminal.emulator.rows() as u16,
    );
    let mut widget = StatusBarWidget::new(&session.server.name, session.status, &app.theme)
        .size(size)
        .scroll(session.terminal.scroll_offset)
        .tick(app.ticks);
    if let Some(error) = &session.error {
        widget = widget.error(error);
    }
    frame.render_widget(widget, area);
}

/// Suggestion popup, anchored inside the focused pane.
fn render_overlay(app: &App, frame: &mut Frame) {
    let Some(id) = app.focused_session_id() else {
        return;
    };
    let Some(session) = app.sessions.get(&id) else {
        return;
    };
    if !session.autocomplete.is_visible() {
        return;
    }
    let Some(inner) = pane_inner(app, &id) else {
        return;
    };
    frame.render_widget(
        SuggestionsOverlay::new(
            &session.autocomplete,
            &app.theme,
            session.terminal.cursor_cell(),
        ),
        inner,
    );
}

fn pane_inner(app: &App, id: &SessionId) -> Option<Rect> {
    let (_, area) = app.pane_areas.iter().find(|(pane, _)| pane == id)?;
    if area.width < 2 || area.height < 2 {
        return None;
    }
    Some(Rect::new(
        area.x + 1,
        area.y + 1,
        area.width - 2,
        area.height - 2,
    ))
}

fn render_auth_prompt(app: &App, frame: &mut Frame) {
    if let Some(prompt) = &app.auth_prompt {
        let area = frame.area();
        frame.render_widget(AuthPromptWidget::new(prompt, &app.theme), area);
    }
}
