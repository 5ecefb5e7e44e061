use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single backend request.
///
/// None of these are fatal: the console logs them and keeps running.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned {status}: {body}")]
    Status {
        path: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("could not decode reply from {path}: {reason}")]
    Decode { path: &'static str, reason: String },
}

impl ConsoleError {
    pub fn path(&self) -> &'static str {
        match self {
            ConsoleError::Transport { path, .. }
            | ConsoleError::Status { path, .. }
            | ConsoleError::Decode { path, .. } => *path,
        }
    }
}
