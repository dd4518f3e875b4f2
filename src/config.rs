//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--log-level`, `--log-file`, etc.)
//! 2. `$RTERM_CONFIG` environment variable (path to config file)
//! 3. Project-local `.rterm.toml` in the current working directory
//! 4. Global `~/.config/rterm/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Server to open at launch (overridden by the CLI positional arg).
    pub default_server: Option<String>,
    /// Enable mouse support.
    pub mouse: Option<bool>,
}

/// Terminal pane settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TerminalConfig {
    /// Scrollback buffer size in lines.
    pub scrollback_lines: Option<usize>,
    /// Rendered glyph cell width in pixels, used for viewport fitting and
    /// overlay anchoring.
    pub cell_width_px: Option<f64>,
    /// Rendered glyph cell height in pixels.
    pub cell_height_px: Option<f64>,
    /// Inner padding of the pane content box, pixels per side.
    pub padding_px: Option<f64>,
    /// Shell command spawned for local sessions.
    pub shell: Option<String>,
}

/// Timing knobs for debounce windows and the connect settle delay.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TimingConfig {
    /// Trailing debounce for container resize events, milliseconds.
    pub resize_debounce_ms: Option<u64>,
    /// Trailing debounce for suggestion searches, milliseconds.
    pub search_debounce_ms: Option<u64>,
    /// Pause after a successful connect before the first forced resize.
    pub settle_delay_ms: Option<u64>,
}

/// Command-history settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HistoryConfig {
    /// Record flushed command lines.
    pub enabled: Option<bool>,
    /// Maximum distinct commands kept per server.
    pub max_entries: Option<usize>,
}

/// Snippet store settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SnippetsConfig {
    /// Path to the snippet JSON file.
    pub path: Option<String>,
}

/// Logging section mirrored by `--log-level` / `--log-file`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path; defaults to the cache directory.
    pub file: Option<String>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
    pub border_focused_fg: Option<String>,
    pub popup_bg: Option<String>,
    pub popup_fg: Option<String>,
    pub popup_selected_bg: Option<String>,
    pub popup_selected_fg: Option<String>,
    pub dialog_bg: Option<String>,
    pub dialog_border_fg: Option<String>,
    pub tab_bg: Option<String>,
    pub tab_fg: Option<String>,
    pub tab_active_bg: Option<String>,
    pub tab_active_fg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

/// One saved server entry from `[[servers]]`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Display name, also the CLI lookup key.
    pub name: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    /// "saved" connects with stored parameters; "quick" requires a
    /// password entered at connect time.
    pub provider: Option<String>,
    /// Per-server shell command override.
    pub command: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub terminal: TerminalConfig,
    pub timing: TimingConfig,
    pub history: HistoryConfig,
    pub snippets: SnippetsConfig,
    pub logging: LoggingConfig,
    pub theme: ThemeConfig,
    pub servers: Vec<ServerConfig>,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default scrollback buffer size in lines.
pub const DEFAULT_SCROLLBACK_LINES: usize = 1000;
/// Default glyph cell width in pixels.
pub const DEFAULT_CELL_WIDTH_PX: f64 = 9.0;
/// Default glyph cell height in pixels.
pub const DEFAULT_CELL_HEIGHT_PX: f64 = 18.0;
/// Default pane content padding in pixels.
pub const DEFAULT_PADDING_PX: f64 = 8.0;
/// Default resize debounce in milliseconds.
pub const DEFAULT_RESIZE_DEBOUNCE_MS: u64 = 100;
/// Default suggestion-search debounce in milliseconds.
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 200;
/// Default connect settle delay in milliseconds.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 300;
/// Default per-server history capacity.
pub const DEFAULT_HISTORY_MAX_ENTRIES: usize = 5000;

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; that is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. $RTERM_CONFIG environment variable
    if let Ok(env_path) = std::env::var("RTERM_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    // 2. Project-local `.rterm.toml` in CWD
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".rterm.toml"));
    }

    // 3. Global `~/.config/rterm/config.toml`
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("rterm").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return None,
    };
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

/// Merge helper: `base` provides defaults; `over` overrides `base`.
/// For each `Option` field, if `over` has `Some`, use it; otherwise keep `base`.
impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                default_server: other
                    .general
                    .default_server
                    .clone()
                    .or(self.general.default_server),
                mouse: other.general.mouse.or(self.general.mouse),
            },
            terminal: TerminalConfig {
                scrollback_lines: other
                    .terminal
                    .scrollback_lines
                    .or(self.terminal.scrollback_lines),
                cell_width_px: other.terminal.cell_width_px.or(self.terminal.cell_width_px),
                cell_height_px: other
                    .terminal
                    .cell_height_px
                    .or(self.terminal.cell_height_px),
                padding_px: other.terminal.padding_px.or(self.terminal.padding_px),
                shell: other.terminal.shell.clone().or(self.terminal.shell),
            },
            timing: TimingConfig {
                resize_debounce_ms: other
                    .timing
                    .resize_debounce_ms
                    .or(self.timing.resize_debounce_ms),
                search_debounce_ms: other
                    .timing
                    .search_debounce_ms
                    .or(self.timing.search_debounce_ms),
                settle_delay_ms: other.timing.settle_delay_ms.or(self.timing.settle_delay_ms),
            },
            history: HistoryConfig {
                enabled: other.history.enabled.or(self.history.enabled),
                max_entries: other.history.max_entries.or(self.history.max_entries),
            },
            snippets: SnippetsConfig {
                path: other.snippets.path.clone().or(self.snippets.path),
            },
            logging: LoggingConfig {
                level: other.logging.level.clone().or(self.logging.level),
                file: other.logging.file.clone().or(self.logging.file),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: match (&self.theme.custom, &other.theme.custom) {
                    (_, Some(o)) => Some(o.clone()),
                    (Some(s), None) => Some(s.clone()),
                    (None, None) => None,
                },
            },
            servers: if other.servers.is_empty() {
                self.servers
            } else {
                other.servers.clone()
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        // Start with built-in defaults (all None).
        let mut config = AppConfig::default();

        // Load from candidate files (lowest priority first so higher overwrites).
        let paths = candidate_paths();
        // Walk in reverse so that highest-priority (env var) overwrites lower.
        for path in paths.iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        // Explicit --config file has higher priority than candidates.
        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        // CLI flag overrides are highest priority.
        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    /// Server opened at launch when no positional arg is given.
    pub fn default_server(&self) -> Option<&str> {
        self.general.default_server.as_deref()
    }

    /// Whether mouse support is enabled.
    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    /// Scrollback buffer size in lines.
    pub fn scrollback_lines(&self) -> usize {
        self.terminal
            .scrollback_lines
            .unwrap_or(DEFAULT_SCROLLBACK_LINES)
    }

    /// Glyph cell width in pixels.
    pub fn cell_width_px(&self) -> f64 {
        self.terminal.cell_width_px.unwrap_or(DEFAULT_CELL_WIDTH_PX)
    }

    /// Glyph cell height in pixels.
    pub fn cell_height_px(&self) -> f64 {
        self.terminal
            .cell_height_px
            .unwrap_or(DEFAULT_CELL_HEIGHT_PX)
    }

    /// Pane content padding in pixels.
    pub fn padding_px(&self) -> f64 {
        self.terminal.padding_px.unwrap_or(DEFAULT_PADDING_PX)
    }

    /// Shell command for local sessions.
    pub fn shell_command(&self) -> String {
        self.terminal.shell.clone().unwrap_or_else(|| {
            std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
        })
    }

    /// Resize debounce window.
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(
            self.timing
                .resize_debounce_ms
                .unwrap_or(DEFAULT_RESIZE_DEBOUNCE_MS),
        )
    }

    /// Suggestion-search debounce window.
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(
            self.timing
                .search_debounce_ms
                .unwrap_or(DEFAULT_SEARCH_DEBOUNCE_MS),
        )
    }

    /// Connect settle delay.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.timing.settle_delay_ms.unwrap_or(DEFAULT_SETTLE_DELAY_MS))
    }

    /// Whether history recording is on.
    pub fn history_enabled(&self) -> bool {
        self.history.enabled.unwrap_or(true)
    }

    /// History store capacity per server.
    pub fn history_max_entries(&self) -> usize {
        self.history
            .max_entries
            .unwrap_or(DEFAULT_HISTORY_MAX_ENTRIES)
    }

    /// Snippet file path, defaulting next to the global config.
    pub fn snippets_path(&self) -> Option<PathBuf> {
        match &self.snippets.path {
            Some(p) => Some(PathBuf::from(p)),
            None => dirs::config_dir().map(|d| d.join("rterm").join("snippets.json")),
        }
    }

    /// Logging level string, if configured.
    pub fn log_level(&self) -> Option<&str> {
        self.logging.level.as_deref()
    }

    /// Logging file path, if configured.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging.file.as_ref().map(PathBuf::from)
    }

    /// Theme scheme: "dark", "light", or "custom".
    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }

    /// Look up a `[[servers]]` entry by name.
    pub fn find_server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.name == name)
    }
}

impl ServerConfig {
    /// Whether the entry requires a password at connect time.
    pub fn is_quick(&self) -> bool {
        self.provider.as_deref() == Some("quick")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
