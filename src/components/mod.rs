//! Ratatui widgets composing the UI.

pub mod auth_prompt;
pub mod status_bar;
pub mod suggestions;
pub mod tabs;
pub mod terminal;
