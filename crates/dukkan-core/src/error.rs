use thiserror::Error;

/// Top-level error type for Dukkan.
#[derive(Debug, Error)]
pub enum DukkanError {
    /// Network or protocol failure from the model provider.
    #[error("provider transport error: {0}")]
    Transport(String),

    /// Rate limit or quota exhaustion from the model provider.
    #[error("provider quota error: {0}")]
    Quota(String),

    /// Provider call exceeded its deadline.
    #[error("provider timeout: {0}")]
    Timeout(String),

    /// Error from the messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Catalog fetch/parse error (internal — never escapes the catalog port).
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Order recording sink error.
    #[error("recorder error: {0}")]
    Recorder(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DukkanError {
    /// Whether this is one of the provider-port failure kinds.
    ///
    /// The gateway treats all three identically (apology text, no
    /// history mutation), but logs distinguish them.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Quota(_) | Self::Timeout(_)
        )
    }
}
