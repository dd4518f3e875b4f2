use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::session::{SessionStatus, SizeSpec};
use crate::theme::ThemeColors;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Status bar: active server, connection state, negotiated viewport size
/// and key hints, or a full-width error banner.
pub struct StatusBarWidget<'a> {
    server: &'a str,
    status: SessionStatus,
    theme: &'a ThemeColors,
    size: Option<SizeSpec>,
    error: Option<&'a str>,
    scroll: usize,
    ticks: usize,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(server: &'a str, status: SessionStatus, theme: &'a ThemeColors) -> Self {
        Self {
            server,
            status,
            theme,
            size: None,
            error: None,
            scroll: 0,
            ticks: 0,
        }
    }

    /// Last size handed to the host, if any was sent yet.
    pub fn size(mut self, size: SizeSpec) -> Self {
        if size != SizeSpec::ZERO {
            self.size = Some(size);
        }
        self
    }

    pub fn error(mut self, message: &'a str) -> Self {
        self.error = Some(message);
        self
    }

    /// Lines currently scrolled up into the scrollback.
    pub fn scroll(mut self, offset: usize) -> Self {
        self.scroll = offset;
        self
    }

    /// Frame counter driving the spinner shown while connecting.
    pub fn tick(mut self, ticks: usize) -> Self {
        self.ticks = ticks;
        self
    }

    fn status_glyph(&self) -> &'static str {
        match self.status {
            SessionStatus::Connecting => SPINNER[(self.ticks / 6) % SPINNER.len()],
            _ => "●",
        }
    }

    fn status_color(&self) -> Color {
        match self.status {
            SessionStatus::Connecting => self.theme.warning_fg,
            SessionStatus::Connected => self.theme.success_fg,
            SessionStatus::Error => self.theme.error_fg,
            SessionStatus::Idle | SessionStatus::Disconnected => self.theme.dim_fg,
        }
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        buf.set_style(area, Style::default().bg(self.theme.status_bg));
        let width = area.width as usize;

        if let Some(msg) = self.error {
            let style = Style::default()
                .bg(self.theme.error_fg)
                .fg(self.theme.status_fg);
            let text = format!(" ✗ {msg}");
            let display: String = if text.chars().count() >= width {
                text.chars().take(width).collect()
            } else {
                format!("{text:<width$}")
            };
            let line = Line::from(Span::styled(display, style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        let key_hints = " ^T:tab  ^W:close  ^S:split  ^Q:quit ";
        let hints_len = key_hints.len();

        let status_style = Style::default().fg(self.status_color());
        let mut spans = vec![
            Span::styled(
                format!(" {} ", self.server),
                Style::default()
                    .fg(self.theme.status_fg)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} {}", self.status_glyph(), self.status.label()),
                status_style,
            ),
        ];

        if let Some(size) = self.size {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                size.to_string(),
                Style::default().fg(self.theme.info_fg),
            ));
        }

        if self.scroll > 0 {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("[+{}]", self.scroll),
                Style::default()
                    .fg(self.theme.warning_fg)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let pad = width.saturating_sub(used).saturating_sub(hints_len);
        if pad > 0 {
            spans.push(Span::raw(" ".repeat(pad)));
        }
        spans.push(Span::styled(
            key_hints,
            Style::default()
                .fg(self.theme.dim_fg)
                .add_modifier(Modifier::DIM),
        ));

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
