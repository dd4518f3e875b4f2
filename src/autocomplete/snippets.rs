//! Saved command snippets, loaded once from a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};

/// Languages whose snippets are offered inside a shell session. Snippets
/// without a language count as shell snippets.
pub const SHELL_LANGUAGES: &[&str] = &["bash", "shell", "sh", "zsh", "text"];

/// One saved snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub title: String,
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Snippet {
    pub fn is_shell(&self) -> bool {
        match self.language.as_deref() {
            None | Some("") => true,
            Some(language) => SHELL_LANGUAGES.contains(&language.to_ascii_lowercase().as_str()),
        }
    }
}

/// In-memory snippet collection. The backing file is read at startup;
/// a missing file is the same as an empty collection.
#[derive(Debug, Default)]
pub struct SnippetStore {
    snippets: Vec<Snippet>,
}

impl SnippetStore {
    pub fn new(snippets: Vec<Snippet>) -> Self {
        Self { snippets }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no snippets file");
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        let snippets: Vec<Snippet> = serde_json::from_str(&raw).map_err(|err| {
            AppError::Config(format!("Invalid snippets file {}: {err}", path.display()))
        })?;
        debug!(count = snippets.len(), path = %path.display(), "snippets loaded");
        Ok(Self { snippets })
    }

    /// Shell snippets whose code contains `query`, case-insensitively.
    pub fn search_shell(&self, query: &str, limit: usize) -> Vec<Snippet> {
        let needle = query.to_lowercase();
        self.snippets
            .iter()
            .filter(|snippet| snippet.is_shell())
            .filter(|snippet| snippet.code.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }
}
