/// Convenience result type used across artstream.
pub type ArtstreamResult<T> = Result<T, ArtstreamError>;

/// Top-level error taxonomy used by library APIs.
///
/// Malformed marker text and out-of-order lifecycle events are not errors: the extractor treats
/// unterminated blocks as still streaming and the generation machine ignores rejected events.
#[derive(thiserror::Error, Debug)]
pub enum ArtstreamError {
    /// Invalid caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A block store failed to save a finalized block.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ArtstreamError {
    /// Build a [`ArtstreamError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ArtstreamError::Persistence`] value.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Build a [`ArtstreamError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for ArtstreamError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
