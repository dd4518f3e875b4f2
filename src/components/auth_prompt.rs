use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::AuthPrompt;
use crate::theme::ThemeColors;

/// Centered modal asking for a password before (re)connecting. The input
/// is always rendered masked.
pub struct AuthPromptWidget<'a> {
    prompt: &'a AuthPrompt,
    theme: &'a ThemeColors,
}

impl<'a> AuthPromptWidget<'a> {
    pub fn new(prompt: &'a AuthPrompt, theme: &'a ThemeColors) -> Self {
        Self { prompt, theme }
    }

    fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        let w = width.min(area.width);
        let h = height.min(area.height);
        Rect::new(x, y, w, h)
    }
}

impl<'a> Widget for AuthPromptWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 20 || area.height < 7 {
            return;
        }

        let dialog_width = 50.min(area.width.saturating_sub(4));
        let dialog_height = 7;
        let rect = Self::centered_rect(dialog_width, dialog_height, area);

        Clear.render(rect, buf);

        let block = Block::default()
            .title(" Re-authenticate ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.dialog_border_fg))
            .style(Style::default().bg(self.theme.dialog_bg))
            .padding(Padding::horizontal(1));

        let inner = block.inner(rect);
        block.render(rect, buf);

        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let context = if self.prompt.expired {
            Span::styled(
                format!("Session expired for {}.", self.prompt.server),
                Style::default().fg(self.theme.warning_fg),
            )
        } else {
            Span::styled(
                format!("Password required for {}.", self.prompt.server),
                Style::default().fg(self.theme.info_fg),
            )
        };
        buf.set_line(inner.x, inner.y, &Line::from(context), inner.width);

        // Masked input, cursor block at the end.
        let mask = "•".repeat(self.prompt.input.chars().count());
        let input_line = Line::from(vec![
            Span::styled(
                "Password: ",
                Style::default().fg(self.theme.popup_label_fg),
            ),
            Span::styled(mask, Style::default().fg(self.theme.popup_fg)),
            Span::styled(
                " ",
                Style::default()
                    .bg(self.theme.popup_fg)
                    .add_modifier(Modifier::BOLD),
            ),
        ]);
        buf.set_line(inner.x, inner.y + 2, &input_line, inner.width);

        let hint = "[Enter] Connect  [Esc] Cancel";
        let hint_line = Line::from(Span::styled(
            hint,
            Style::default()
                .fg(self.theme.dim_fg)
                .add_modifier(Modifier::DIM),
        ));
        buf.set_line(inner.x, inner.y + inner.height - 1, &hint_line, inner.width);
    }
}
