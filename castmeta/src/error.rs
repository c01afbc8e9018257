//! Error types for the metadata monitoring core

/// Result type alias for metadata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while polling or managing stream monitors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading the stream body failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The stream URL carries no station identifier
    #[error("No station identifier in stream URL: {0}")]
    MissingStationId(String),

    /// The metadata API answered with a non-success status
    #[error("Metadata API returned error status: {0}")]
    ApiStatus(reqwest::StatusCode),

    /// The stream violated the in-band metadata framing
    #[error("Metadata framing violation: {0}")]
    Framing(String),

    /// Invalid extraction pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Device-control backend error
    #[error(transparent)]
    Control(#[from] castcontrol::ControlError),

    /// State-store backend error
    #[error(transparent)]
    Store(#[from] caststore::StoreError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
