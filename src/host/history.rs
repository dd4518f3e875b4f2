//! In-process command-history store: recording filter and ranked search.
//!
//! Recording is deliberately lossy. Noise (junk strings, bare numbers) and
//! anything that looks like it carries a secret never reaches the store.

use std::collections::{HashMap, HashSet};

use super::HistoryMatch;

/// Markers that flag a command line as secret-bearing when followed by
/// `=` or a space-separated value.
const SENSITIVE_MARKERS: &[&str] = &[
    "password",
    "passwd",
    "token",
    "secret",
    "key",
    "auth",
    "mysql_pwd",
    "access_key",
    "credential",
];

/// Keyboard-mash fragments that are never worth recalling.
const JUNK_PATTERNS: &[&str] = &["asdf", "qwer", "zxcv", "123456"];

/// Single-letter commands worth keeping (common aliases).
const SINGLE_CHAR_ALLOWED: &[char] = &['l', 'g', 'v'];

/// Decide whether a flushed command line should be persisted.
pub fn should_record(command: &str) -> bool {
    if command.is_empty() || command.starts_with(' ') {
        return false;
    }
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let mut chars = trimmed.chars();
    if let (Some(only), None) = (chars.next(), chars.next()) {
        return SINGLE_CHAR_ALLOWED.contains(&only.to_ascii_lowercase());
    }
    let lower = trimmed.to_lowercase();
    if JUNK_PATTERNS.iter().any(|junk| lower.contains(junk)) {
        return false;
    }
    for marker in SENSITIVE_MARKERS {
        if lower.contains(&format!("{marker}=")) || lower.contains(&format!("{marker} ")) {
            return false;
        }
    }
    true
}

#[derive(Debug, Clone)]
struct CommandStats {
    global_exec_count: u64,
    last_used_at: u64,
    last_source: String,
    servers: HashSet<String>,
}

/// Frequency-ranked command history, capped at `max_entries` distinct
/// commands with least-recently-used eviction.
#[derive(Debug)]
pub struct HistoryStore {
    entries: HashMap<String, CommandStats>,
    clock: u64,
    max_entries: usize,
}

impl HistoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            clock: 0,
            max_entries: max_entries.max(1),
        }
    }

    /// Record one executed command for `server_id`. Lines rejected by
    /// [`should_record`] are dropped silently.
    pub fn record(&mut self, server_id: &str, command: &str, source: &str) {
        if !should_record(command) {
            return;
        }
        let command = command.trim();
        self.clock += 1;
        let clock = self.clock;

        if !self.entries.contains_key(command) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        let stats = self
            .entries
            .entry(command.to_string())
            .or_insert_with(|| CommandStats {
                global_exec_count: 0,
                last_used_at: 0,
                last_source: String::new(),
                servers: HashSet::new(),
            });
        stats.global_exec_count += 1;
        stats.last_used_at = clock;
        stats.last_source = source.to_string();
        stats.servers.insert(server_id.to_string());
    }

    /// Case-insensitive prefix search, most executed first, then most
    /// recent. `server_id` narrows results to commands seen on that server.
    pub fn search(&self, server_id: Option<&str>, query: &str, limit: usize) -> Vec<HistoryMatch> {
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        let mut hits: Vec<(&String, &CommandStats)> = self
            .entries
            .iter()
            .filter(|(command, stats)| {
                command.to_lowercase().starts_with(&needle)
                    && server_id.map_or(true, |id| stats.servers.contains(id))
            })
            .collect();
        hits.sort_by(|a, b| {
            b.1.global_exec_count
                .cmp(&a.1.global_exec_count)
                .then(b.1.last_used_at.cmp(&a.1.last_used_at))
        });
        hits.truncate(limit);
        hits.into_iter()
            .map(|(command, stats)| HistoryMatch {
                command: command.clone(),
                exec_count: stats.global_exec_count,
            })
            .collect()
    }

    /// Number of distinct commands stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest) = self
            .entries
            .iter()
            .min_by_key(|(_, stats)| stats.last_used_at)
            .map(|(command, _)| command.clone())
        {
            self.entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_ranks_by_frequency() {
        let mut store = HistoryStore::new(100);
        store.record("dev", "git status", "input");
        store.record("dev", "git status", "input");
        store.record("dev", "git stash", "input");

        let hits = store.search(None, "git st", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].command, "git status");
        assert_eq!(hits[0].exec_count, 2);
        assert_eq!(hits[1].command, "git stash");
    }

    #[test]
    fn recency_breaks_frequency_ties() {
        let mut store = HistoryStore::new(100);
        store.record("dev", "ls -la", "input");
        store.record("dev", "ls -lh", "input");

        let hits = store.search(None, "ls", 10);
        assert_eq!(hits[0].command, "ls -lh");
        assert_eq!(hits[1].command, "ls -la");
    }

    #[test]
    fn prefix_match_is_case_insensitive() {
        let mut store = HistoryStore::new(100);
        store.record("dev", "Docker ps", "input");
        let hits = store.search(None, "docker", 10);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn server_filter_narrows_results() {
        let mut store = HistoryStore::new(100);
        store.record("alpha", "uptime", "input");
        store.record("beta", "uname -a", "input");

        assert_eq!(store.search(Some("alpha"), "u", 10).len(), 1);
        assert_eq!(store.search(Some("beta"), "u", 10).len(), 1);
        assert_eq!(store.search(None, "u", 10).len(), 2);
        assert!(store.search(Some("gamma"), "u", 10).is_empty());
    }

    #[test]
    fn empty_query_returns_nothing() {
        let mut store = HistoryStore::new(100);
        store.record("dev", "ls", "input");
        assert!(store.search(None, "", 10).is_empty());
    }

    #[test]
    fn eviction_drops_least_recently_used() {
        let mut store = HistoryStore::new(2);
        store.record("dev", "first", "input");
        store.record("dev", "second", "input");
        store.record("dev", "first", "input"); // refresh "first"
        store.record("dev", "third", "input"); // evicts "second"

        assert_eq!(store.len(), 2);
        assert!(store.search(None, "second", 10).is_empty());
        assert_eq!(store.search(None, "first", 10).len(), 1);
    }

    #[test]
    fn filter_rejects_noise() {
        assert!(!should_record(""));
        assert!(!should_record("   "));
        assert!(!should_record(" ls")); // leading space opts out
        assert!(!should_record("12345"));
        assert!(!should_record("asdfasdf"));
        assert!(!should_record("qwerty"));
        assert!(!should_record("x"));
    }

    #[test]
    fn filter_allows_common_single_letter_aliases() {
        assert!(should_record("l"));
        assert!(should_record("g"));
        assert!(should_record("v"));
        assert!(!should_record("q"));
    }

    #[test]
    fn filter_rejects_secret_bearing_lines() {
        assert!(!should_record("export PASSWORD=hunter2"));
        assert!(!should_record("mysql -u root --password hunter2"));
        assert!(!should_record("curl -H 'token abc123'"));
        assert!(!should_record("export ACCESS_KEY=AKIA..."));
    }

    #[test]
    fn filter_allows_ordinary_commands() {
        assert!(should_record("git status"));
        assert!(should_record("ls -la"));
        assert!(should_record("ssh-keygen -t ed25519"));
        assert!(should_record("passwd"));
    }

    #[test]
    fn rejected_lines_never_reach_the_store() {
        let mut store = HistoryStore::new(100);
        store.record("dev", "export TOKEN=abc", "input");
        store.record("dev", "123", "input");
        assert!(store.is_empty());
    }
}
