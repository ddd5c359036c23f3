// Error types shared by every stage of the upload pipeline.
// The interactive loop prints these and moves on to the next turn; none
// of them terminates the process on its own.

use std::collections::TryReserveError;
use thiserror::Error;

/// Everything that can end a turn early.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration key {0} is not set")]
    ConfigMissing(&'static str),

    #[error("unsupported file type: {0} (expected .png, .jpg, .jpeg or .pdf)")]
    UnsupportedFileType(String),

    #[error("upload URL not found in the upload session response headers")]
    UploadUrlMissing,

    #[error("file URI not found in the upload response")]
    FileUriMissing,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("network failure: {0}")]
    NetworkFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("out of memory while buffering the response")]
    OutOfMemory(#[from] TryReserveError),

    #[error("server answered {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("value for header {0} is not a valid header value")]
    InvalidHeader(String),

    #[error("invalid base64 input: {0}")]
    MalformedBase64(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap any transport-level cause (connect, TLS, timeout, read).
    pub fn network<E>(cause: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::NetworkFailure(cause.into())
    }
}

/// Result type used across the library.
pub type Result<T> = std::result::Result<T, Error>;
