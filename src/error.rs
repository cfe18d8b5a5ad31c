//! Error types for pattern evaluation and the doublefetch job.
//!
//! Every failure is either *permanent* (malformed patterns, permanent HTTP
//! statuses; retrying cannot help) or *transient* (network hiccups,
//! unparsable documents; the scheduler may retry later). Callers branch on
//! [`Error::is_permanent`] instead of matching variants.

use thiserror::Error;

/// Result type alias for extraction and fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the extraction core and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The pattern set is structurally invalid (bad selector, bad transform
    /// shape, output field referencing an undeclared input, ...).
    #[error("malformed pattern: {0}")]
    Pattern(String),

    /// A transform step named a primitive this build does not provide.
    #[error("unknown transform: {0:?}")]
    UnknownTransform(String),

    /// The server answered with a status that will not improve on retry.
    #[error("permanent http status {0}")]
    PermanentHttp(u16),

    /// The request itself failed (connect, timeout, body read, 5xx).
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The fetched document could not be processed.
    #[error("parse failed: {0}")]
    Parse(String),
}

impl Error {
    /// True when retrying the same job cannot succeed.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Error::Pattern(_) | Error::UnknownTransform(_) | Error::PermanentHttp(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_classification() {
        assert!(Error::Pattern("x".into()).is_permanent());
        assert!(Error::UnknownTransform("x".into()).is_permanent());
        assert!(Error::PermanentHttp(429).is_permanent());
        assert!(!Error::Fetch("timeout".into()).is_permanent());
        assert!(!Error::Parse("bad html".into()).is_permanent());
    }
}
