use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::session::SessionStatus;
use crate::theme::ThemeColors;

/// One entry in the tab strip.
pub struct TabEntry {
    pub name: String,
    pub status: SessionStatus,
}

/// Top tab strip: numbered server tabs with a status dot each.
pub struct TabStripWidget<'a> {
    tabs: &'a [TabEntry],
    active: usize,
    theme: &'a ThemeColors,
}

impl<'a> TabStripWidget<'a> {
    pub fn new(tabs: &'a [TabEntry], active: usize, theme: &'a ThemeColors) -> Self {
        Self {
            tabs,
            active,
            theme,
        }
    }

    fn dot_color(&self, status: SessionStatus) -> Color {
        match status {
            SessionStatus::Connecting => self.theme.warning_fg,
            SessionStatus::Connected => self.theme.success_fg,
            SessionStatus::Error => self.theme.error_fg,
            SessionStatus::Idle | SessionStatus::Disconnected => self.theme.dim_fg,
        }
    }
}

impl<'a> Widget for TabStripWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let base = Style::default().bg(self.theme.tab_bg);
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_style(base);
            }
        }

        let mut spans = Vec::with_capacity(self.tabs.len() * 3);
        for (idx, tab) in self.tabs.iter().enumerate() {
            let active = idx == self.active;
            let tab_style = if active {
                Style::default()
                    .bg(self.theme.tab_active_bg)
                    .fg(self.theme.tab_active_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().bg(self.theme.tab_bg).fg(self.theme.tab_fg)
            };
            spans.push(Span::styled(format!(" {}:", idx + 1), tab_style));
            spans.push(Span::styled(
                "●",
                tab_style.fg(self.dot_color(tab.status)),
            ));
            spans.push(Span::styled(format!(" {} ", tab.name), tab_style));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;

    fn row_string(buf: &Buffer, width: u16) -> String {
        (0..width)
            .map(|x| buf.cell((x, 0)).unwrap().symbol().to_string())
            .collect()
    }

    fn entries() -> Vec<TabEntry> {
        vec![
            TabEntry {
                name: "prod-db".to_string(),
                status: SessionStatus::Connected,
            },
            TabEntry {
                name: "jump".to_string(),
                status: SessionStatus::Disconnected,
            },
        ]
    }

    #[test]
    fn strip_numbers_and_names_all_tabs() {
        let tabs = entries();
        let theme = theme::dark_theme();
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        TabStripWidget::new(&tabs, 0, &theme).render(area, &mut buf);

        let content = row_string(&buf, 60);
        assert!(content.contains("1:"));
        assert!(content.contains("prod-db"));
        assert!(content.contains("2:"));
        assert!(content.contains("jump"));
    }

    #[test]
    fn active_tab_uses_the_active_background() {
        let tabs = entries();
        let theme = theme::dark_theme();
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        TabStripWidget::new(&tabs, 1, &theme).render(area, &mut buf);

        let has_active_bg = (0..60).any(|x| buf.cell((x, 0)).unwrap().bg == theme.tab_active_bg);
        assert!(has_active_bg);
    }

    #[test]
    fn overflow_is_truncated_without_panic() {
        let tabs: Vec<TabEntry> = (0..20)
            .map(|i| TabEntry {
                name: format!("server-{i}"),
                status: SessionStatus::Idle,
            })
            .collect();
        let theme = theme::dark_theme();
        let area = Rect::new(0, 0, 30, 1);
        let mut buf = Buffer::empty(area);
        TabStripWidget::new(&tabs, 19, &theme).render(area, &mut buf);
    }

    #[test]
    fn zero_area_does_not_panic() {
        let tabs = entries();
        let theme = theme::dark_theme();
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        TabStripWidget::new(&tabs, 0, &theme).render(area, &mut buf);
    }
}
