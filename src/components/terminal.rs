//! Pane widget rendering a session's emulated terminal grid.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Widget};

use crate::terminal::SessionTerminal;
use crate::theme::ThemeColors;

/// Widget that renders the emulator contents, honouring the pane's
/// scrollback offset.
pub struct TerminalWidget<'a> {
    terminal: &'a SessionTerminal,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
    show_cursor: bool,
}

impl<'a> TerminalWidget<'a> {
    pub fn new(terminal: &'a SessionTerminal, theme: &'a ThemeColors, show_cursor: bool) -> Self {
        Self {
            terminal,
            theme,
            block: None,
            show_cursor,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl<'a> Widget for TerminalWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(ref block) = self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        // Window over scrollback + grid: offset 0 pins the view to the
        // bottom, scrolling up moves the window into the scrollback.
        let lines = self.terminal.render_lines();
        let height = inner.height as usize;
        let offset = self
            .terminal
            .scroll_offset
            .min(lines.len().saturating_sub(height));
        let end = lines.len() - offset;
        let start = end.saturating_sub(height);

        for (row_idx, line) in lines[start..end].iter().enumerate() {
            let y = inner.y + row_idx as u16;
            buf.set_line(inner.x, y, line, inner.width);
        }

        // The cursor lives in the grid, which is only on screen while
        // the view sits at the bottom.
        if self.show_cursor && offset == 0 {
            let (cursor_row, cursor_col) = self.terminal.emulator.cursor();
            let line_idx = self.terminal.emulator.scrollback_len() + cursor_row;
            if line_idx >= start && line_idx < end {
                let cursor_y = inner.y + (line_idx - start) as u16;
                let cursor_x = inner.x + cursor_col as u16;
                if cursor_x < inner.x + inner.width {
                    if let Some(cell) = buf.cell_mut((cursor_x, cursor_y)) {
                        cell.set_style(
                            Style::default()
                                .fg(Color::Black)
                                .bg(self.theme.border_focused_fg)
                                .add_modifier(Modifier::BOLD),
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::CellMetrics;
    use crate::theme;

    fn test_terminal(rows: usize, cols: usize) -> SessionTerminal {
        SessionTerminal::new(
            rows,
            cols,
            100,
            CellMetrics {
                width: 9.0,
                height: 18.0,
            },
            8.0,
        )
    }

    fn row_string(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width)
            .map(|x| {
                buf.cell((x, y))
                    .map(|c| c.symbol().chars().next().unwrap_or(' '))
                    .unwrap_or(' ')
            })
            .collect()
    }

    #[test]
    fn renders_plain_output() {
        let mut terminal = test_terminal(24, 80);
        terminal.process_bytes(b"Hello World");
        let theme = theme::dark_theme();

        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        TerminalWidget::new(&terminal, &theme, false).render(area, &mut buf);

        assert_eq!(&row_string(&buf, 0, 11), "Hello World");
    }

    #[test]
    fn renders_colored_spans_at_the_right_columns() {
        let mut terminal = test_terminal(24, 80);
        terminal.process_bytes(b"ok \x1b[31mbad\x1b[0m end");
        let theme = theme::dark_theme();

        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        TerminalWidget::new(&terminal, &theme, false).render(area, &mut buf);

        assert_eq!(&row_string(&buf, 0, 10), "ok bad end");
        let red_cell = buf.cell((3, 0)).unwrap();
        assert_eq!(red_cell.style().fg, Some(Color::Red));
    }

    #[test]
    fn cursor_cell_is_inverted_when_shown() {
        let mut terminal = test_terminal(24, 80);
        terminal.process_bytes(b"$ ");
        let theme = theme::dark_theme();

        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        TerminalWidget::new(&terminal, &theme, true).render(area, &mut buf);

        // Cursor sits at column 2 after "$ ".
        let cell = buf.cell((2, 0)).unwrap();
        assert_eq!(cell.style().bg, Some(theme.border_focused_fg));
    }

    #[test]
    fn scroll_offset_moves_the_window_into_scrollback() {
        let mut terminal = test_terminal(4, 20);
        for i in 0..12 {
            terminal.process_bytes(format!("line {i}\r\n").as_bytes());
        }
        let theme = theme::dark_theme();
        let area = Rect::new(0, 0, 20, 4);

        let mut buf = Buffer::empty(area);
        TerminalWidget::new(&terminal, &theme, false).render(area, &mut buf);
        let bottom = row_string(&buf, 0, 10);
        assert!(bottom.contains("line 9"), "got {bottom:?}");

        terminal.scroll_offset = 5;
        let mut buf = Buffer::empty(area);
        TerminalWidget::new(&terminal, &theme, false).render(area, &mut buf);
        let scrolled = row_string(&buf, 0, 10);
        assert!(scrolled.contains("line 4"), "got {scrolled:?}");
    }

    #[test]
    fn zero_sized_area_does_not_panic() {
        let terminal = test_terminal(24, 80);
        let theme = theme::dark_theme();
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        TerminalWidget::new(&terminal, &theme, true).render(area, &mut buf);
    }
}
