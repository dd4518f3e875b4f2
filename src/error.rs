use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from terminal or disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Session host command failures (connect, resize, write).
    #[error("Host error: {0}")]
    Host(String),

    /// Configuration file problems (unreadable, unparseable, bad values).
    #[error("Config error: {0}")]
    Config(String),

    /// Referenced server name not present in the configuration.
    #[error("Unknown server: {0}")]
    UnknownServer(String),
}

impl AppError {
    /// True when a connect failure should offer the re-authentication
    /// prompt instead of being surfaced verbatim.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            AppError::Host(msg) => {
                msg.contains("Auth Failed") || msg.to_lowercase().contains("denied")
            }
            _ => false,
        }
    }

    /// Bare message without the variant prefix, for user-facing banners.
    pub fn detail(&self) -> String {
        match self {
            AppError::Host(msg) | AppError::Terminal(msg) | AppError::Config(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
