//! Error types for the chart services.

use projection::ProjectionError;
use thiserror::Error;

/// Result type alias using ChartError.
pub type ChartResult<T> = Result<T, ChartError>;

/// Primary error type for chart operations.
#[derive(Debug, Error)]
pub enum ChartError {
    // === Data Errors ===
    /// Malformed entry, bad border expression or inconsistent pixel sizes.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A raster claims georeferencing but required fields are absent.
    #[error("Georeferencing error for '{entry}': {message}")]
    Georeferencing { entry: String, message: String },

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Not found: {0}")]
    NotFound(String),

    // === Request Errors ===
    /// The tile-count guard tripped.
    #[error("Request needs {count} tiles along {axis} (limit {limit})")]
    ResourceLimit {
        axis: &'static str,
        count: u64,
        limit: u32,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Render budget exceeded after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Fieldless discriminant of [`ChartError`], for matching and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Georeferencing,
    ProjectionRange,
    Convergence,
    Projection,
    ResourceLimit,
    NotFound,
    InvalidRequest,
    Timeout,
    Io,
    Image,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Georeferencing => "georeferencing",
            ErrorKind::ProjectionRange => "projection_range",
            ErrorKind::Convergence => "convergence",
            ErrorKind::Projection => "projection",
            ErrorKind::ResourceLimit => "resource_limit",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Io => "io",
            ErrorKind::Image => "image",
            ErrorKind::Internal => "internal",
        }
    }
}

impl ChartError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ChartError::Configuration(message.into())
    }

    pub fn georeferencing(entry: impl Into<String>, message: impl Into<String>) -> Self {
        ChartError::Georeferencing {
            entry: entry.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ChartError::NotFound(what.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        ChartError::InvalidRequest(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChartError::Configuration(_) => ErrorKind::Configuration,
            ChartError::Georeferencing { .. } => ErrorKind::Georeferencing,
            ChartError::Projection(ProjectionError::OutOfRange { .. }) => ErrorKind::ProjectionRange,
            ChartError::Projection(ProjectionError::NoConvergence { .. }) => ErrorKind::Convergence,
            ChartError::Projection(_) => ErrorKind::Projection,
            ChartError::ResourceLimit { .. } => ErrorKind::ResourceLimit,
            ChartError::NotFound(_) => ErrorKind::NotFound,
            ChartError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ChartError::Timeout { .. } => ErrorKind::Timeout,
            ChartError::Io(_) => ErrorKind::Io,
            ChartError::Image(_) => ErrorKind::Image,
            ChartError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error only signals absent data.
    pub fn is_not_found(&self) -> bool {
        match self {
            ChartError::NotFound(_) => true,
            ChartError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Get the OGC exception code a protocol front-end would report.
    pub fn exception_code(&self) -> &'static str {
        match self {
            ChartError::InvalidRequest(_) => "InvalidParameterValue",
            ChartError::Projection(ProjectionError::OutOfRange { .. }) => "InvalidBBox",
            ChartError::Projection(ProjectionError::InvalidZone(_))
            | ChartError::Projection(ProjectionError::MissingZone) => "InvalidCRS",
            ChartError::ResourceLimit { .. } => "InvalidParameterValue",
            ChartError::NotFound(_) => "LayerNotDefined",
            _ => "NoApplicableCode",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ChartError::InvalidRequest(_) | ChartError::Projection(_) => 400,

            ChartError::NotFound(_) => 404,

            ChartError::ResourceLimit { .. } => 413,

            ChartError::Timeout { .. } => 504,

            _ => 500,
        }
    }
}

impl From<serde_json::Error> for ChartError {
    fn from(err: serde_json::Error) -> Self {
        ChartError::Configuration(format!("JSON error: {}", err))
    }
}
