//! Validation errors for incoming chat turns.

/// Malformed turn input. Surfaced to callers with 4xx semantics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The message list is missing or empty.
    #[error("Historial de mensajes inválido")]
    InvalidMessages,

    /// The device identifier is missing or blank.
    #[error("Falta deviceId")]
    MissingDeviceId,
}
