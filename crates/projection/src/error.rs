//! Projection error types.

use thiserror::Error;

/// Result type for projection operations.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// Errors raised by coordinate conversions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// Latitude outside the projection's valid band.
    #[error("{system}: latitude {lat} outside valid range ±{limit}")]
    OutOfRange {
        system: &'static str,
        lat: f64,
        limit: f64,
    },

    /// Iterative inverse failed to converge.
    #[error("{system}: inverse did not converge after {iterations} iterations")]
    NoConvergence {
        system: &'static str,
        iterations: usize,
    },

    /// UTM conversion requested without a zone.
    #[error("UTM conversion requires a zone")]
    MissingZone,

    /// Zone string not of the form `NN` + `N`/`S`.
    #[error("invalid UTM zone: {0}")]
    InvalidZone(String),
}
