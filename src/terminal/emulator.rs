//! Terminal emulation: a vte-driven screen model with scrollback.
//!
//! [`Screen`] implements `vte::Perform` directly; [`TerminalEmulator`] pairs
//! it with the parser and is the only type the rest of the crate touches.
//! Covers the printable path, cursor movement, erase operations, and the
//! SGR subset interactive shells actually emit (basic, bright, 256-color,
//! truecolor). Everything else is parsed and ignored.

use std::collections::VecDeque;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Attributes carried by every cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellStyle {
    pub fg: Color,
    pub bg: Color,
    pub modifiers: Modifier,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            fg: Color::Reset,
            bg: Color::Reset,
            modifiers: Modifier::empty(),
        }
    }
}

/// One character cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub style: CellStyle,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            style: CellStyle::default(),
        }
    }
}

/// The emulated screen: visible grid, scrollback, cursor, current style.
#[derive(Debug)]
pub struct Screen {
    rows: usize,
    cols: usize,
    grid: Vec<Vec<Cell>>,
    cursor_row: usize,
    cursor_col: usize,
    saved_cursor: Option<(usize, usize)>,
    scrollback: VecDeque<Vec<Cell>>,
    scrollback_limit: usize,
    style: CellStyle,
}

impl Screen {
    pub fn new(rows: usize, cols: usize, scrollback_limit: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            grid: vec![vec![Cell::default(); cols]; rows],
            cursor_row: 0,
            cursor_col: 0,
            saved_cursor: None,
            scrollback: VecDeque::new(),
            scrollback_limit,
            style: CellStyle::default(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Cursor position within the visible grid, `(row, col)`.
    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_row, self.cursor_col)
    }

    fn set_cursor(&mut self, row: usize, col: usize) {
        self.cursor_row = row.min(self.rows - 1);
        self.cursor_col = col.min(self.cols - 1);
    }

    /// Scroll the grid up one line, moving the top line into scrollback.
    fn scroll_up(&mut self) {
        let top = self.grid.remove(0);
        if self.scrollback_limit > 0 {
            if self.scrollback.len() >= self.scrollback_limit {
                self.scrollback.pop_front();
            }
            self.scrollback.push_back(top);
        }
        self.grid.push(vec![Cell::default(); self.cols]);
    }

    fn line_feed(&mut self) {
        if self.cursor_row + 1 >= self.rows {
            self.scroll_up();
        } else {
            self.cursor_row += 1;
        }
    }

    fn reverse_line_feed(&mut self) {
        if self.cursor_row == 0 {
            self.grid.pop();
            self.grid.insert(0, vec![Cell::default(); self.cols]);
        } else {
            self.cursor_row -= 1;
        }
    }

    fn erase_in_display(&mut self, mode: u16) {
        match mode {
            0 => {
                self.erase_in_line(0);
                for row in self.grid.iter_mut().skip(self.cursor_row + 1) {
                    row.fill(Cell::default());
                }
            }
            1 => {
                self.erase_in_line(1);
                for row in self.grid.iter_mut().take(self.cursor_row) {
                    row.fill(Cell::default());
                }
            }
            2 | 3 => {
                for row in self.grid.iter_mut() {
                    row.fill(Cell::default());
                }
            }
            _ => {}
        }
    }

    fn erase_in_line(&mut self, mode: u16) {
        let row = &mut self.grid[self.cursor_row];
        match mode {
            0 => row[self.cursor_col..].fill(Cell::default()),
            1 => row[..=self.cursor_col.min(self.cols - 1)].fill(Cell::default()),
            2 => row.fill(Cell::default()),
            _ => {}
        }
    }

    fn insert_lines(&mut self, n: usize) {
        for _ in 0..n.min(self.rows - self.cursor_row) {
            self.grid.pop();
            self.grid
                .insert(self.cursor_row, vec![Cell::default(); self.cols]);
        }
    }

    fn delete_lines(&mut self, n: usize) {
        for _ in 0..n.min(self.rows - self.cursor_row) {
            self.grid.remove(self.cursor_row);
            self.grid.push(vec![Cell::default(); self.cols]);
        }
    }

    fn delete_chars(&mut self, n: usize) {
        let row = &mut self.grid[self.cursor_row];
        for _ in 0..n.min(self.cols - self.cursor_col) {
            row.remove(self.cursor_col);
            row.push(Cell::default());
        }
    }

    fn insert_blanks(&mut self, n: usize) {
        let row = &mut self.grid[self.cursor_row];
        for _ in 0..n.min(self.cols - self.cursor_col) {
            row.insert(self.cursor_col, Cell::default());
        }
        row.truncate(self.cols);
    }

    fn apply_sgr(&mut self, params: &vte::Params) {
        if params.is_empty() {
            self.style = CellStyle::default();
            return;
        }
        let groups: Vec<Vec<u16>> = params.iter().map(|group| group.to_vec()).collect();
        let mut i = 0;
        while i < groups.len() {
            let group = &groups[i];
            let code = group.first().copied().unwrap_or(0);
            match code {
                0 => self.style = CellStyle::default(),
                1 => self.style.modifiers |= Modifier::BOLD,
                2 => self.style.modifiers |= Modifier::DIM,
                3 => self.style.modifiers |= Modifier::ITALIC,
                4 => self.style.modifiers |= Modifier::UNDERLINED,
                7 => self.style.modifiers |= Modifier::REVERSED,
                9 => self.style.modifiers |= Modifier::CROSSED_OUT,
                22 => self.style.modifiers.remove(Modifier::BOLD | Modifier::DIM),
                23 => self.style.modifiers.remove(Modifier::ITALIC),
                24 => self.style.modifiers.remove(Modifier::UNDERLINED),
                27 => self.style.modifiers.remove(Modifier::REVERSED),
                29 => self.style.modifiers.remove(Modifier::CROSSED_OUT),
                30..=37 => self.style.fg = basic_color(code - 30, false),
                39 => self.style.fg = Color::Reset,
                40..=47 => self.style.bg = basic_color(code - 40, false),
                49 => self.style.bg = Color::Reset,
                90..=97 => self.style.fg = basic_color(code - 90, true),
                100..=107 => self.style.bg = basic_color(code - 100, true),
                38 | 48 => {
                    let (color, consumed) = extended_color(group, &groups[i + 1..]);
                    if let Some(color) = color {
                        if code == 38 {
                            self.style.fg = color;
                        } else {
                            self.style.bg = color;
                        }
                    }
                    i += consumed;
                }
                _ => {}
            }
            i += 1;
        }
    }
}

/// Map an SGR basic color index (0-7) to a ratatui color.
fn basic_color(index: u16, bright: bool) -> Color {
    match (index, bright) {
        (0, false) => Color::Black,
        (1, false) => Color::Red,
        (2, false) => Color::Green,
        (3, false) => Color::Yellow,
        (4, false) => Color::Blue,
        (5, false) => Color::Magenta,
        (6, false) => Color::Cyan,
        (7, false) => Color::Gray,
        (0, true) => Color::DarkGray,
        (1, true) => Color::LightRed,
        (2, true) => Color::LightGreen,
        (3, true) => Color::LightYellow,
        (4, true) => Color::LightBlue,
        (5, true) => Color::LightMagenta,
        (6, true) => Color::LightCyan,
        (7, true) => Color::White,
        _ => Color::Reset,
    }
}

/// Decode SGR 38/48 extended colors in both colon (`38:5:196`) and
/// semicolon (`38;5;196`) forms. Returns the color plus how many extra
/// semicolon groups were consumed.
fn extended_color(group: &[u16], rest: &[Vec<u16>]) -> (Option<Color>, usize) {
    // Colon form carries everything in one group.
    if group.len() >= 2 {
        return match group[1] {
            5 if group.len() >= 3 => (Some(Color::Indexed(group[2] as u8)), 0),
            2 if group.len() >= 5 => (
                Some(Color::Rgb(group[2] as u8, group[3] as u8, group[4] as u8)),
                0,
            ),
            _ => (None, 0),
        };
    }
    // Semicolon form spreads across following groups.
    let mode = rest.first().and_then(|g| g.first()).copied();
    match mode {
        Some(5) => {
            let idx = rest.get(1).and_then(|g| g.first()).copied();
            (idx.map(|n| Color::Indexed(n as u8)), 2)
        }
        Some(2) => {
            let r = rest.get(1).and_then(|g| g.first()).copied();
            let g = rest.get(2).and_then(|g| g.first()).copied();
            let b = rest.get(3).and_then(|g| g.first()).copied();
            match (r, g, b) {
                (Some(r), Some(g), Some(b)) => (Some(Color::Rgb(r as u8, g as u8, b as u8)), 4),
                _ => (None, 4),
            }
        }
        _ => (None, 0),
    }
}

impl vte::Perform for Screen {
    fn print(&mut self, c: char) {
        if self.cursor_col >= self.cols {
            self.cursor_col = 0;
            self.line_feed();
        }
        self.grid[self.cursor_row][self.cursor_col] = Cell {
            ch: c,
            style: self.style,
        };
        self.cursor_col += 1;
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x08 => {
                // Backspace moves the cursor; erasing is the shell's job.
                if self.cursor_col > 0 {
                    self.cursor_col -= 1;
                }
            }
            0x09 => {
                let next_stop = ((self.cursor_col / 8) + 1) * 8;
                self.set_cursor(self.cursor_row, next_stop.min(self.cols - 1));
            }
            0x0A | 0x0B | 0x0C => self.line_feed(),
            0x0D => self.cursor_col = 0,
            _ => {}
        }
    }

    fn csi_dispatch(
        &mut self,
        params: &vte::Params,
        _intermediates: &[u8],
        _ignore: bool,
        action: char,
    ) {
        let mut iter = params.iter();
        let p1 = iter.next().and_then(|p| p.first()).copied().unwrap_or(0);
        let p2 = iter.next().and_then(|p| p.first()).copied().unwrap_or(0);
        let n1 = p1.max(1) as usize;

        match action {
            'A' => self.set_cursor(self.cursor_row.saturating_sub(n1), self.cursor_col),
            'B' => self.set_cursor(self.cursor_row + n1, self.cursor_col),
            'C' => self.set_cursor(self.cursor_row, self.cursor_col + n1),
            'D' => self.set_cursor(self.cursor_row, self.cursor_col.saturating_sub(n1)),
            'G' => self.set_cursor(self.cursor_row, n1 - 1),
            'd' => self.set_cursor(n1 - 1, self.cursor_col),
            'H' | 'f' => {
                let col = (p2.max(1) as usize) - 1;
                self.set_cursor(n1 - 1, col);
            }
            'J' => self.erase_in_display(p1),
            'K' => self.erase_in_line(p1),
            'L' => self.insert_lines(n1),
            'M' => self.delete_lines(n1),
            'P' => self.delete_chars(n1),
            '@' => self.insert_blanks(n1),
            'm' => self.apply_sgr(params),
            's' => self.saved_cursor = Some((self.cursor_row, self.cursor_col)),
            'u' => {
                if let Some((row, col)) = self.saved_cursor {
                    self.set_cursor(row, col);
                }
            }
            _ => {}
        }
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, byte: u8) {
        match byte {
            b'7' => self.saved_cursor = Some((self.cursor_row, self.cursor_col)),
            b'8' => {
                if let Some((row, col)) = self.saved_cursor {
                    self.set_cursor(row, col);
                }
            }
            b'M' => self.reverse_line_feed(),
            b'c' => {
                *self = Screen::new(self.rows, self.cols, self.scrollback_limit);
            }
            _ => {}
        }
    }
}

/// Parser plus screen, the public face of the emulator.
pub struct TerminalEmulator {
    parser: vte::Parser,
    screen: Screen,
}

impl TerminalEmulator {
    pub fn new(rows: usize, cols: usize, scrollback_limit: usize) -> Self {
        Self {
            parser: vte::Parser::new(),
            screen: Screen::new(rows, cols, scrollback_limit),
        }
    }

    /// Feed raw output bytes through the parser.
    pub fn process_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.parser.advance(&mut self.screen, *byte);
        }
    }

    /// Cursor position within the visible grid, `(row, col)`.
    pub fn cursor(&self) -> (usize, usize) {
        self.screen.cursor()
    }

    pub fn rows(&self) -> usize {
        self.screen.rows()
    }

    pub fn cols(&self) -> usize {
        self.screen.cols()
    }

    /// Resize the grid, clamping the cursor. Rows below the cursor are
    /// dropped first when shrinking; any further excess scrolls out the
    /// top into scrollback. New rows appear blank at the bottom.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let screen = &mut self.screen;

        for row in screen.grid.iter_mut() {
            row.resize(cols, Cell::default());
        }
        screen.cols = cols;

        while screen.grid.len() > rows && screen.grid.len() - 1 > screen.cursor_row {
            screen.grid.pop();
        }
        while screen.grid.len() > rows {
            let top = screen.grid.remove(0);
            if screen.scrollback_limit > 0 {
                if screen.scrollback.len() >= screen.scrollback_limit {
                    screen.scrollback.pop_front();
                }
                screen.scrollback.push_back(top);
            }
            screen.cursor_row = screen.cursor_row.saturating_sub(1);
        }
        while screen.grid.len() < rows {
            screen.grid.push(vec![Cell::default(); cols]);
        }
        screen.rows = rows;
        screen.cursor_row = screen.cursor_row.min(rows - 1);
        screen.cursor_col = screen.cursor_col.min(cols - 1);
    }

    /// Scrollback line count.
    pub fn scrollback_len(&self) -> usize {
        self.screen.scrollback.len()
    }

    /// Visible rows plus scrollback.
    #[cfg(test)]
    pub fn total_lines(&self) -> usize {
        self.screen.scrollback.len() + self.screen.rows
    }

    /// Render every line (scrollback first, then the grid) for display.
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        self.screen
            .scrollback
            .iter()
            .chain(self.screen.grid.iter())
            .map(|row| row_to_line(row))
            .collect()
    }

    /// Plain text of one visible grid row, trailing blanks trimmed.
    #[cfg(test)]
    pub fn row_text(&self, row: usize) -> String {
        match self.screen.grid.get(row) {
            Some(cells) => cells
                .iter()
                .map(|cell| cell.ch)
                .collect::<String>()
                .trim_end()
                .to_string(),
            None => String::new(),
        }
    }
}

/// Collapse a row of cells into styled spans, merging same-style runs.
fn row_to_line(row: &[Cell]) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_style = CellStyle::default();

    for cell in row {
        if cell.style != run_style && !run.is_empty() {
            spans.push(styled_span(std::mem::take(&mut run), run_style));
        }
        run_style = cell.style;
        run.push(cell.ch);
    }
    if !run.is_empty() {
        spans.push(styled_span(run, run_style));
    }
    Line::from(spans)
}

fn styled_span(text: String, style: CellStyle) -> Span<'static> {
    Span::styled(
        text,
        Style::default()
            .fg(style.fg)
            .bg(style.bg)
            .add_modifier(style.modifiers),
    )
}
