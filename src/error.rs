//! Error types for fetching, formatting and cursor construction.

use reqwest::StatusCode;
use thiserror::Error;

/// Failures of a single read call against the remote endpoint.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response (connect, TLS, timeout, body read).
    #[error("read request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with something other than 200 OK.
    #[error("bad status {0}")]
    Status(StatusCode),

    /// The body was not a `{"data": .., "offset": ..}` object.
    #[error("malformed read response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The endpoint reported a negative offset or size.
    #[error("invalid offset {0} in read response")]
    InvalidOffset(i64),
}

/// Failures encoding a line or entry.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A required task coordinate was empty.
    #[error("{0} cannot be empty")]
    EmptyCoordinate(&'static str),

    /// The line limit must be at least one.
    #[error("max lines must be positive")]
    InvalidMaxLines,

    /// The fetch window must be at least one byte.
    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// A configured request header was not a valid HTTP header.
    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    /// The pull was abandoned before its fetch completed.
    #[error("read cancelled")]
    Cancelled,
}

impl Error {
    /// True for errors raised while talking to the endpoint.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Error::Fetch(_))
    }
}
