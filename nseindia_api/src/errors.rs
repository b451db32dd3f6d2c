//! Error types for the API layer.

/// Errors that can occur when talking to the NSE API or preparing a request.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The connection failed, timed out, or the response could not be read.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The API returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// A 2xx response whose body was not valid JSON.
    #[error("Failed to parse response: {0}")]
    Json(#[from] serde_json::Error),
    /// A route or base URL that does not form a valid absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The session was closed before or during the request.
    #[error("Session {0} is closed")]
    SessionClosed(u64),
    /// A period token and explicit bounds that do not form a valid date range.
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
    /// A period token that is not one of the known names.
    #[error("Unknown period token: {0}")]
    UnknownPeriod(String),
    /// An index name outside the set the announcements route accepts.
    #[error("Unknown index: {0}")]
    UnknownIndex(String),
}

impl Error {
    /// HTTP status code, when the failure came with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true for failures a fresh session may fix: transport errors
    /// and non-2xx statuses.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::HttpStatus { .. })
    }
}
