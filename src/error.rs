use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by a relay session. Malformed upstream lines never show up
/// here; they are dropped inside the stream.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid upstream endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Connection refused, DNS failure, timeout or a reset in the middle of the body.
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream answered with a non-2xx status before any content was streamed.
    #[error("upstream returned {status}: {body}")]
    UpstreamStatus { status: StatusCode, body: String },
}

/// Failures of a one-shot (non-streaming) chat turn.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Error: {body}")]
    Upstream { status: StatusCode, body: String },
}
