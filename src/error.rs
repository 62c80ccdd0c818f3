//! Centralized error handling for the Nova daemon.
//!
//! Mirrors the error kinds of the design: each reply-producing handler
//! converts a `NovaError` into a short human-readable line carrying a
//! stable sigil and code so CLI callers can pattern-match without parsing
//! JSON, while the supervisor only ever treats `Config`/`Bind` as fatal.

use thiserror::Error;

/// Every error kind the daemon can produce.
#[derive(Debug, Error)]
pub enum NovaError {
    /// Missing or invalid configuration at startup. Fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// The listening socket could not be created or bound. Fatal at
    /// startup; at runtime it demotes the process to graceful shutdown.
    #[error("bind error: {0}")]
    Bind(String),

    /// A persistence failure in the memory store.
    #[error("store error: {0}")]
    Store(String),

    /// A malformed request or unknown command.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A filesystem error inside the bridge directory tree.
    #[error("bridge error: {0}")]
    Bridge(String),

    /// A failure talking to an optional external collaborator (TTS,
    /// external LLM API). Never fatal.
    #[error("external error: {0}")]
    External(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl NovaError {
    /// Stable machine token for the error kind, independent of the
    /// human-readable message.
    pub fn code(&self) -> &'static str {
        match self {
            NovaError::Config(_) => "CONFIG_ERROR",
            NovaError::Bind(_) => "BIND_ERROR",
            NovaError::Store(_) => "STORE_ERROR",
            NovaError::Protocol(_) => "PROTOCOL_ERROR",
            NovaError::Bridge(_) => "BRIDGE_ERROR",
            NovaError::External(_) => "EXTERNAL_ERROR",
            NovaError::Io(_) => "IO_ERROR",
            NovaError::Serialization(_) => "SERIALIZATION_ERROR",
            NovaError::Database(_) => "STORE_ERROR",
        }
    }

    /// The error sigil + token every error reply begins with, per the
    /// wire contract (§7): `⚠ <CODE>: <message>`.
    pub fn as_reply(&self) -> String {
        format!("\u{26a0} {}: {}", self.code(), self)
    }
}

pub type Result<T> = std::result::Result<T, NovaError>;
