// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The kernel notification channel could not be opened (usually
    /// `fs.inotify.max_user_instances` exhausted).
    #[error("failed to open change-notification channel: {0}")]
    ChannelInit(#[source] std::io::Error),

    /// A read on the notification channel failed with something other than
    /// "would block".
    #[error("failed to read change notifications: {0}")]
    EventRead(#[source] std::io::Error),

    #[error("invalid port range {start}-{end} (expected 1 <= start <= end <= 65535)")]
    InvalidPortRange { start: u32, end: u32 },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GuardError>;
