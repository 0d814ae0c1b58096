use std::fmt;

/// Session-level errors.
///
/// Malformed frames are NOT errors: the ingestion boundary falls back to
/// documented defaults and still processes the frame. Only engine lifecycle
/// failures surface here, and nothing in this crate retries them.
#[derive(Debug)]
pub enum FeedError {
    /// No engine handle attached, or the engine is not ready at session
    /// start. Fatal to start; no session is created.
    EngineUnavailable,
    /// The engine's start call reported failure.
    EngineRejected(String),
    /// Explicit error surfaced by an engine call mid-session. The session is
    /// torn down immediately; retry policy belongs to the caller.
    EngineStep(String),
    SerializationError(String),
    DeserializationError(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeedError::EngineUnavailable => {
                write!(f, "engine unavailable: no ready engine handle")
            }
            FeedError::EngineRejected(msg) => {
                write!(f, "engine rejected session start: {}", msg)
            }
            FeedError::EngineStep(msg) => {
                write!(f, "engine step error: {}", msg)
            }
            FeedError::SerializationError(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            FeedError::DeserializationError(msg) => {
                write!(f, "Deserialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for FeedError {}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() {
            FeedError::DeserializationError(err.to_string())
        } else {
            FeedError::SerializationError(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
