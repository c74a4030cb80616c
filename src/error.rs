use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Error type for the fallible library surface (config loading and reload).
///
/// Chat turns never fail: provider trouble is retried or degraded inside the
/// gateway and surfaces as a [`crate::chat::Reply::Error`] instead.
#[derive(Debug, Error)]
pub enum ChatkeepError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, ChatkeepError>;
