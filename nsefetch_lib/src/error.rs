//! Error types for the client layer.

use std::fmt;
use std::time::Duration;

/// Errors produced by the client, wrapping API-layer errors and adding the
/// failure modes of the background loop and the retry policy.
#[derive(Debug)]
pub enum NseFetchError {
    /// An error from the API layer that was not retried (bad date range,
    /// malformed JSON, invalid route).
    Api(nseindia_api::Error),
    /// The blocking bridge gave up waiting; the scheduled work was cancelled.
    Timeout(Duration),
    /// The background loop has already been shut down.
    LoopClosed,
    /// The scheduled work panicked or was dropped before producing a result.
    TaskFailed(String),
    /// Every attempt failed. The client has been shut down.
    RetriesExhausted {
        attempts: usize,
        last: nseindia_api::Error,
    },
    /// The warm-up visit never succeeded. The client has been shut down.
    SessionUnavailable { attempts: usize },
    /// User-provided input or configuration failed validation.
    InvalidInput(String),
    /// Filesystem or thread-spawn failure.
    Io(std::io::Error),
    /// Writing delimited output failed.
    Csv(csv::Error),
}

impl fmt::Display for NseFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "API error: {}", e),
            Self::Timeout(after) => write!(
                f,
                "Timed out after {:.2} seconds waiting for the event loop",
                after.as_secs_f64()
            ),
            Self::LoopClosed => write!(f, "Event loop is closed"),
            Self::TaskFailed(msg) => write!(f, "Background task failed: {}", msg),
            Self::RetriesExhausted { attempts, last } => {
                write!(f, "Retry limit exhausted after {} attempts: {}", attempts, last)
            }
            Self::SessionUnavailable { attempts } => write!(
                f,
                "Could not establish a session after {} attempts",
                attempts
            ),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Csv(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl std::error::Error for NseFetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::RetriesExhausted { last, .. } => Some(last),
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl NseFetchError {
    /// True when the client shut itself down as part of producing this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RetriesExhausted { .. } | Self::SessionUnavailable { .. } | Self::LoopClosed
        )
    }
}

impl From<nseindia_api::Error> for NseFetchError {
    fn from(e: nseindia_api::Error) -> Self {
        Self::Api(e)
    }
}

impl From<std::io::Error> for NseFetchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for NseFetchError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}
