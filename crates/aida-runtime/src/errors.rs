//! Runtime error types.

use std::path::PathBuf;

use aida_core::ValidationError;
use aida_llm::ProviderError;
use aida_store::StoreError;

/// Errors that can end a turn or block startup.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Malformed request. The message is shown to the client as is.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Persistence failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Model generation failure.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Protocol document could not be loaded.
    #[error("Protocol error: {path}: {message}")]
    Protocol {
        /// File that failed.
        path: PathBuf,
        /// Error description.
        message: String,
    },
}

/// Errors returned from [`crate::TurnOrchestrator::handle_turn`].
pub type TurnError = RuntimeError;

impl RuntimeError {
    /// Whether the caller sent bad input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Store(_) => "store",
            Self::Provider(_) => "provider",
            Self::Protocol { .. } => "protocol",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_is_passthrough() {
        let err = RuntimeError::from(ValidationError::MissingDeviceId);
        assert_eq!(err.to_string(), "Falta deviceId");
        assert!(err.is_client_error());
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn provider_error_is_server_side() {
        let err = RuntimeError::from(ProviderError::Other {
            message: "boom".into(),
        });
        assert!(!err.is_client_error());
        assert_eq!(err.kind(), "provider");
        assert_eq!(err.to_string(), "Provider error: boom");
    }
}
