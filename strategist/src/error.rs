//! Error types for analysis runs, chat turns and the generation client.

use std::time::Duration;

use thiserror::Error;

use crate::llm::RequestKind;

/// Failure of one outbound generation call or of a whole analysis run.
///
/// The orchestrator does not recover from any variant: whichever step raises it,
/// the caller receives this error and no partial [`AnalysisResult`](crate::AnalysisResult).
#[derive(Debug, Error)]
pub enum StrategistError {
    /// Missing or malformed configuration (e.g. no API key, bad number in env).
    #[error("configuration error: {0}")]
    Config(String),

    /// Request could not be sent or the response body could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The generation service answered with a non-success status.
    #[error("generation service returned {status}: {body}")]
    Service { status: u16, body: String },

    /// The prompt was rejected by the service's safety filter.
    #[error("prompt blocked by generation service: {0}")]
    Blocked(String),

    /// The service answered without any candidate, or a stream ended with no text.
    #[error("{0} response contained no text")]
    EmptyResponse(RequestKind),

    /// Structured response text did not parse as its declared JSON shape.
    #[error("{kind} response did not match its schema: {message}")]
    Parse { kind: RequestKind, message: String },

    /// A chat turn failed; carries the message the stream reported.
    #[error("chat turn failed: {0}")]
    ChatTurn(String),

    #[error("analysis timed out after {0:?}")]
    TimedOut(Duration),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for StrategistError {
    fn from(e: reqwest::Error) -> Self {
        StrategistError::Transport(e.to_string())
    }
}
