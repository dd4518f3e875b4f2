//! Cursor-anchored autocomplete popup.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Padding, Widget};

use crate::autocomplete::AutocompleteState;
use crate::theme::ThemeColors;

/// Popup listing the current suggestions, anchored at the column where
/// the typed text begins, one row below the cursor line. Flips above the
/// cursor when there is no room underneath.
pub struct SuggestionsOverlay<'a> {
    state: &'a AutocompleteState,
    theme: &'a ThemeColors,
    /// Cursor cell within the pane, `(row, col)`.
    cursor: (usize, usize),
}

impl<'a> SuggestionsOverlay<'a> {
    pub fn new(state: &'a AutocompleteState, theme: &'a ThemeColors, cursor: (usize, usize)) -> Self {
        Self {
            state,
            theme,
            cursor,
        }
    }

    fn row_width(value: &str, label: Option<&str>) -> usize {
        let mut width = 2 + value.chars().count();
        if let Some(label) = label {
            width += 2 + label.chars().count();
        }
        width
    }
}

impl<'a> Widget for SuggestionsOverlay<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let items = self.state.items();
        if !self.state.is_visible() || items.is_empty() {
            return;
        }
        if area.width < 8 || area.height < 3 {
            return;
        }

        let content_width = items
            .iter()
            .map(|item| Self::row_width(&item.value, item.label.as_deref()))
            .max()
            .unwrap_or(0) as u16;
        // Borders plus one cell of horizontal padding per side.
        let popup_width = (content_width + 4).min(area.width);
        let popup_height = (items.len() as u16 + 2).min(area.height);

        let (anchor_row, anchor_col) = self.state.anchor_cell(self.cursor);
        let mut x = area.x + (anchor_col as u16).min(area.width.saturating_sub(1));
        if x + popup_width > area.x + area.width {
            x = area.x + area.width - popup_width;
        }

        let below = area.y + anchor_row as u16 + 1;
        let y = if below + popup_height <= area.y + area.height {
            below
        } else {
            (area.y + anchor_row as u16).saturating_sub(popup_height)
        };

        let rect = Rect::new(x, y, popup_width, popup_height);
        Clear.render(rect, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border_focused_fg))
            .style(Style::default().bg(self.theme.popup_bg))
            .padding(Padding::horizontal(1));
        let inner = block.inner(rect);
        block.render(rect, buf);

        for (idx, item) in items.iter().enumerate() {
            if idx as u16 >= inner.height {
                break;
            }
            let selected = idx == self.state.selected();
            let (row_style, value_style) = if selected {
                let base = Style::default()
                    .bg(self.theme.popup_selected_bg)
                    .fg(self.theme.popup_selected_fg);
                (base, base.add_modifier(Modifier::BOLD))
            } else {
                let base = Style::default()
                    .bg(self.theme.popup_bg)
                    .fg(self.theme.popup_fg);
                (base, base)
            };

            let mut spans = Vec::new();
            if selected {
                spans.push(Span::styled(
                    "▸ ",
                    row_style
                        .fg(self.theme.accent_fg)
                        .add_modifier(Modifier::BOLD),
                ));
            } else {
                spans.push(Span::styled("  ", row_style));
            }
            spans.push(Span::styled(item.value.clone(), value_style));
            if let Some(label) = &item.label {
                spans.push(Span::styled(
                    format!("  {label}"),
                    row_style.fg(self.theme.popup_label_fg),
                ));
            }

            let y = inner.y + idx as u16;
            // Paint the row background across the full popup width first.
            for x in inner.x..inner.x + inner.width {
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_style(row_style);
                }
            }
            buf.set_line(inner.x, y, &Line::from(spans), inner.width);
        }
    }
}
