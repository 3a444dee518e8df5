use crate::codec::FramingError;
use thiserror::Error;

/// Error types for the scl-lsp server.
///
/// Only [`LspError::Framing`], [`LspError::Encode`] and [`LspError::Io`] end
/// a session. Everything else is logged and the offending message dropped,
/// or turned into an empty result for the client.
///
/// # Examples
///
/// ```
/// use scl_lsp::error::LspError;
///
/// assert_eq!(
///     LspError::NeedNotFound.to_string(),
///     "could not find a known need at requested position in document"
/// );
/// assert!(!LspError::NeedNotFound.is_fatal());
/// ```
#[derive(Error, Debug)]
pub enum LspError {
    #[error("malformed frame: {0}")]
    Framing(#[from] FramingError),

    #[error("failed to decode message payload: {0}")]
    PayloadDecode(#[source] serde_json::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not find a known need at requested position in document")]
    NeedNotFound,
}

impl LspError {
    /// Returns true if the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Framing(_) | Self::Encode(_) | Self::Io(_))
    }
}

/// Convenience type alias for `Result<T, LspError>`.
pub type Result<T> = std::result::Result<T, LspError>;
