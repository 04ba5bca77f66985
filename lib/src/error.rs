use thiserror::Error;

/// Errors surfaced by the sky model to its callers.
///
/// An empty pick (nothing under the pointer) is not an error and is reported
/// as `None` by the query methods.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SkyError {
    /// Malformed observer coordinates, object definitions or catalogue
    /// references.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Parameters that make a derived value impossible to compute, such as a
    /// degenerate canvas or a non-positive tick frequency.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SkyError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
