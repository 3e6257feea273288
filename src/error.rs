use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MSG_NOT_AN_IMAGE: &str = "Please upload image files only.";
pub const MSG_OFFLINE: &str = "You are offline. Please reconnect to the internet and try again.";
pub const MSG_SERVER_BUSY: &str = "The server is busy right now, please try again later.";
pub const MSG_RETRY_EXHAUSTED: &str =
    "Too many attempts. Please choose a different image or try again later.";

/// Failure category recorded in the session next to the error message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Input was not an image; never retried.
    Validation,
    /// No connectivity when the attempt started or failed.
    Offline,
    /// Non-success status, transport failure, or an unusable response body.
    Server,
    /// Retry cap reached for the current file.
    RetryExhausted,
}

impl FailureKind {
    pub fn message(&self) -> &'static str {
        match self {
            FailureKind::Validation => MSG_NOT_AN_IMAGE,
            FailureKind::Offline => MSG_OFFLINE,
            FailureKind::Server => MSG_SERVER_BUSY,
            FailureKind::RetryExhausted => MSG_RETRY_EXHAUSTED,
        }
    }

    /// Whether the retry policy may resubmit after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Offline | FailureKind::Server)
    }
}

/// Failure reported by the remote removal endpoint seam.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("response body is not an image ({0} bytes)")]
    InvalidPayload(usize),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RemoteError::Status(status.as_u16()),
            None => RemoteError::Transport(err.to_string()),
        }
    }
}

/// Outcome of a controller operation that did not end in success.
///
/// The session state has already been updated by the time one of these is
/// returned; callers may ignore the value and render the snapshot instead.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("'{name}' is not an image (declared type '{media_type}')")]
    Validation { name: String, media_type: String },
    #[error("offline: submission not attempted")]
    Offline,
    #[error("removal failed: {0}")]
    Server(#[from] RemoteError),
    #[error("retry limit of {max} attempts reached")]
    RetryExhausted { max: u32 },
    #[error("a submission is already in flight")]
    Busy,
    #[error("no failed file to retry")]
    NothingToRetry,
    #[error("attempt was superseded by a newer file or a reset")]
    Superseded,
}

impl UploadError {
    /// Session failure category this error maps to, if it is recorded in the session.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            UploadError::Validation { .. } => Some(FailureKind::Validation),
            UploadError::Offline => Some(FailureKind::Offline),
            UploadError::Server(_) => Some(FailureKind::Server),
            UploadError::RetryExhausted { .. } => Some(FailureKind::RetryExhausted),
            UploadError::Busy | UploadError::NothingToRetry | UploadError::Superseded => None,
        }
    }
}
