//! Error types for Spyglass

/// Result type alias for Spyglass operations
pub type Result<T, E = SpyglassError> = std::result::Result<T, E>;

/// Errors raised inside the capture engine.
///
/// None of these ever reach the instrumented request path: the
/// [`CaptureCoordinator`](crate::CaptureCoordinator) logs them and drops or
/// degrades the capture instead.
#[derive(Debug, thiserror::Error)]
pub enum SpyglassError {
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Raw capture input could not be turned into a detail record.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SpyglassError {
    pub(crate) fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }
}

#[cfg(feature = "env")]
impl From<envy::Error> for SpyglassError {
    fn from(err: envy::Error) -> Self {
        SpyglassError::Config(err.to_string())
    }
}
