use std::io;

use thiserror::Error;

/// Failure talking to the weather provider.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to weather provider timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("weather provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err)
        }
    }
}

/// Failure of the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt record on line {line}: {source}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Errors surfaced by [`crate::WeatherService`].
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(#[from] FetchError),
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageError),
}
