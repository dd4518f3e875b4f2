//! Inline command autocomplete.
//!
//! A per-session state machine mirrors the line being typed, decides when
//! a (debounced) suggestion lookup is due, and reconciles results that
//! arrive after further typing: a result set is only installed when the
//! query it answers still matches the live buffer.

pub mod snippets;

use self::snippets::Snippet;
use crate::host::HistoryMatch;

/// History hits offered per lookup.
pub const HISTORY_SLOTS: usize = 3;
/// Snippet hits offered per lookup.
pub const SNIPPET_SLOTS: usize = 3;
/// Overall overlay cap.
pub const MAX_SUGGESTIONS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    History,
    Snippet,
}

/// One overlay row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionItem {
    pub kind: SuggestionKind,
    /// Command text inserted when the row is accepted.
    pub value: String,
    /// Display label; snippets show their title next to the code.
    pub label: Option<String>,
}

impl SuggestionItem {
    pub fn history(value: impl Into<String>) -> Self {
        Self {
            kind: SuggestionKind::History,
            value: value.into(),
            label: None,
        }
    }

    pub fn snippet(value: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: SuggestionKind::Snippet,
            value: value.into(),
            label: Some(title.into()),
        }
    }
}

/// Combine history and snippet hits, history first, each source capped,
/// the whole list capped at [`MAX_SUGGESTIONS`]. Source order is kept.
pub fn merge_suggestions(history: &[HistoryMatch], snippets: &[Snippet]) -> Vec<SuggestionItem> {
    let mut items: Vec<SuggestionItem> = Vec::with_capacity(MAX_SUGGESTIONS);
    for hit in history.iter().take(HISTORY_SLOTS) {
        items.push(SuggestionItem::history(hit.command.clone()));
    }
    for hit in snippets.iter().take(SNIPPET_SLOTS) {
        items.push(SuggestionItem::snippet(hit.code.clone(), hit.title.clone()));
    }
    items.truncate(MAX_SUGGESTIONS);
    items
}

/// What the caller should do after feeding a keystroke chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Buffer changed; debounce a lookup for this query.
    Search(String),
    /// Buffer emptied or reset; cancel pending lookups, overlay is hidden.
    Dismiss,
    /// Nothing changed.
    Idle,
}

/// Per-session overlay state: the mirrored input, the current suggestion
/// rows, and the selection.
#[derive(Debug, Default)]
pub struct AutocompleteState {
    buffer: String,
    items: Vec<SuggestionItem>,
    selected: usize,
    visible: bool,
}

impl AutocompleteState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror one keystroke chunk into the buffer.
    ///
    /// Printable chunks extend the buffer. DEL erases one character and
    /// dismisses the overlay when the buffer runs empty. Enter and any
    /// other control-initiated chunk (escape sequences, ^C) reset the
    /// buffer outright: the line we were completing no longer exists.
    pub fn feed(&mut self, data: &str) -> FeedOutcome {
        if data == "\x7f" {
            if self.buffer.pop().is_none() {
                return FeedOutcome::Idle;
            }
            if self.buffer.is_empty() {
                self.dismiss();
                return FeedOutcome::Dismiss;
            }
            return FeedOutcome::Search(self.buffer.clone());
        }
        match data.chars().next() {
            Some(first) if !first.is_control() => {
                self.buffer.push_str(data);
                FeedOutcome::Search(self.buffer.clone())
            }
            Some(_) => {
                let had_state = !self.buffer.is_empty() || self.visible;
                self.buffer.clear();
                self.dismiss();
                if had_state {
                    FeedOutcome::Dismiss
                } else {
                    FeedOutcome::Idle
                }
            }
            None => FeedOutcome::Idle,
        }
    }

    /// Install a completed lookup, unless it is stale. A result set is
    /// stale when the buffer has changed since the lookup was issued.
    /// Returns whether the results were accepted.
    pub fn accept_results(&mut self, query: &str, items: Vec<SuggestionItem>) -> bool {
        if query != self.buffer {
            return false;
        }
        self.visible = !items.is_empty();
        self.items = items;
        self.selected = 0;
        true
    }

    /// Mirrored line content, as typed so far.
    #[cfg(test)]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn items(&self) -> &[SuggestionItem] {
        &self.items
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&SuggestionItem> {
        self.items.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }

    pub fn select_prev(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + self.items.len() - 1) % self.items.len();
        }
    }

    /// Hide the overlay. The buffer is untouched so typing continues
    /// where it left off.
    pub fn dismiss(&mut self) {
        self.visible = false;
        self.items.clear();
        self.selected = 0;
    }

    /// Forget everything, buffer included. Used on reconnect and teardown.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.dismiss();
    }

    /// Accept the selected row. Returns the byte string to transmit: the
    /// missing suffix when the suggestion extends what was typed, or
    /// enough DELs to erase the typed text followed by the full value.
    /// The buffer is updated as if those bytes had been typed.
    pub fn apply(&mut self) -> Option<String> {
        let item = self.selected_item()?;
        let value = item.value.clone();
        let outgoing = if value.starts_with(&self.buffer) {
            value[self.buffer.len()..].to_string()
        } else {
            let mut bytes = "\x7f".repeat(self.buffer.chars().count());
            bytes.push_str(&value);
            bytes
        };
        self.buffer = value;
        self.dismiss();
        Some(outgoing)
    }

    /// Cell where the typed text begins, the column the overlay is
    /// anchored to. The row below the cursor line is the overlay's first
    /// row.
    pub fn anchor_cell(&self, cursor: (usize, usize)) -> (usize, usize) {
        let (row, col) = cursor;
        (row, col.saturating_sub(self.buffer.chars().count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(commands: &[&str]) -> Vec<HistoryMatch> {
        commands
            .iter()
            .map(|c| HistoryMatch {
                command: c.to_string(),
                exec_count: 1,
            })
            .collect()
    }

    fn snips(codes: &[&str]) -> Vec<Snippet> {
        codes
            .iter()
            .map(|c| Snippet {
                id: c.to_string(),
                title: format!("t:{c}"),
                code: c.to_string(),
                language: None,
                tags: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn typing_accumulates_and_requests_a_search() {
        let mut state = AutocompleteState::new();
        assert_eq!(state.feed("g"), FeedOutcome::Search("g".into()));
        assert_eq!(state.feed("i"), FeedOutcome::Search("gi".into()));
        assert_eq!(state.feed("t"), FeedOutcome::Search("git".into()));
        assert_eq!(state.buffer(), "git");
    }

    #[test]
    fn enter_and_control_chunks_reset_the_buffer() {
        let mut state = AutocompleteState::new();
        state.feed("git");
        assert_eq!(state.feed("\r"), FeedOutcome::Dismiss);
        assert_eq!(state.buffer(), "");

        state.feed("ls");
        assert_eq!(state.feed("\x1b[A"), FeedOutcome::Dismiss);
        assert_eq!(state.buffer(), "");

        state.feed("cd");
        assert_eq!(state.feed("\x03"), FeedOutcome::Dismiss);
        assert_eq!(state.buffer(), "");
    }

    #[test]
    fn control_chunk_with_no_state_is_idle() {
        let mut state = AutocompleteState::new();
        assert_eq!(state.feed("\r"), FeedOutcome::Idle);
    }

    #[test]
    fn backspace_shrinks_then_dismisses_at_empty() {
        let mut state = AutocompleteState::new();
        state.feed("ab");
        state.accept_results("ab", vec![SuggestionItem::history("abc")]);
        assert!(state.is_visible());

        assert_eq!(state.feed("\x7f"), FeedOutcome::Search("a".into()));
        assert_eq!(state.feed("\x7f"), FeedOutcome::Dismiss);
        assert!(!state.is_visible());
        assert_eq!(state.feed("\x7f"), FeedOutcome::Idle);
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut state = AutocompleteState::new();
        state.feed("gi");
        // More typing happens before the lookup for "gi" completes.
        state.feed("t");

        let accepted = state.accept_results("gi", vec![SuggestionItem::history("git pull")]);
        assert!(!accepted);
        assert!(!state.is_visible());

        let accepted = state.accept_results("git", vec![SuggestionItem::history("git pull")]);
        assert!(accepted);
        assert!(state.is_visible());
    }

    #[test]
    fn empty_results_keep_the_overlay_hidden() {
        let mut state = AutocompleteState::new();
        state.feed("zz");
        assert!(state.accept_results("zz", Vec::new()));
        assert!(!state.is_visible());
    }

    #[test]
    fn selection_cycles_both_directions() {
        let mut state = AutocompleteState::new();
        state.feed("g");
        state.accept_results(
            "g",
            vec![
                SuggestionItem::history("git status"),
                SuggestionItem::history("grep -r"),
                SuggestionItem::snippet("go build", "build"),
            ],
        );

        assert_eq!(state.selected(), 0);
        state.select_next();
        state.select_next();
        assert_eq!(state.selected(), 2);
        state.select_next();
        assert_eq!(state.selected(), 0);
        state.select_prev();
        assert_eq!(state.selected(), 2);
    }

    #[test]
    fn apply_sends_only_the_missing_suffix() {
        let mut state = AutocompleteState::new();
        state.feed("git s");
        state.accept_results("git s", vec![SuggestionItem::history("git status")]);

        assert_eq!(state.apply(), Some("tatus".to_string()));
        assert_eq!(state.buffer(), "git status");
        assert!(!state.is_visible());
    }

    #[test]
    fn apply_erases_and_retypes_when_not_a_prefix() {
        let mut state = AutocompleteState::new();
        state.feed("gi");
        state.accept_results("gi", vec![SuggestionItem::snippet("ls -la", "List all")]);

        assert_eq!(state.apply(), Some("\x7f\x7fls -la".to_string()));
        assert_eq!(state.buffer(), "ls -la");
    }

    #[test]
    fn apply_with_nothing_selected_is_a_no_op() {
        let mut state = AutocompleteState::new();
        state.feed("x");
        assert_eq!(state.apply(), None);
    }

    #[test]
    fn merge_caps_each_source_and_the_total() {
        let items = merge_suggestions(
            &history(&["h1", "h2", "h3", "h4", "h5"]),
            &snips(&["s1", "s2", "s3", "s4"]),
        );
        assert_eq!(items.len(), MAX_SUGGESTIONS);
        let values: Vec<&str> = items.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(values, vec!["h1", "h2", "h3", "s1", "s2", "s3"]);
    }

    #[test]
    fn merge_keeps_source_order_when_underfull() {
        let items = merge_suggestions(&history(&["h1"]), &snips(&["s1", "s2"]));
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].kind, SuggestionKind::History);
        assert_eq!(items[1].kind, SuggestionKind::Snippet);
        assert_eq!(items[1].label.as_deref(), Some("t:s1"));
    }

    #[test]
    fn anchor_sits_at_the_start_of_the_typed_text() {
        let mut state = AutocompleteState::new();
        state.feed("git s");
        assert_eq!(state.anchor_cell((4, 12)), (4, 7));
        // Never left of the first column.
        assert_eq!(state.anchor_cell((0, 2)), (0, 0));
    }

    #[test]
    fn escape_dismiss_keeps_the_buffer() {
        let mut state = AutocompleteState::new();
        state.feed("doc");
        state.accept_results("doc", vec![SuggestionItem::history("docker ps")]);
        state.dismiss();
        assert!(!state.is_visible());
        assert_eq!(state.buffer(), "doc");
    }
}
