//! Common error types used throughout vidstage.
//!
//! The four failure kinds callers must tell apart are configuration
//! problems, undecodable source images, non-success transport responses
//! and poll timeouts. Each needs a different remedy, so they are never
//! collapsed into a generic failure.

use std::time::Duration;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid geometry, size or request inputs. Do not retry unchanged.
    Config,
    /// A source image could not be read or decoded.
    Decode,
    /// A create, status or download request failed.
    Request,
    /// The poll loop ran out of time before a terminal status.
    Timeout,
    /// The caller cancelled an in-flight orchestration.
    Cancelled,
    /// The provider reported the job as failed.
    JobFailed,
    /// Local I/O or encoding failure.
    Io,
}

/// Common error type for vidstage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration, geometry or size input.
    #[error("config error: {0}")]
    Config(String),

    /// Source image is unreadable or in an unsupported format.
    #[error("decode error: {0}")]
    Decode(String),

    /// Output image could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// A provider request failed. `status` is `None` when the transport
    /// itself failed before a response arrived.
    #[error("{operation} request failed ({}): {body}", status.map_or_else(|| "no response".to_string(), |s| s.to_string()))]
    Request {
        operation: String,
        status: Option<u16>,
        body: String,
    },

    /// Poll loop exceeded its wall-clock budget.
    #[error("timed out waiting for job {job_id} after {elapsed:?}")]
    Timeout { job_id: String, elapsed: Duration },

    /// Polling was cancelled by the caller.
    #[error("polling cancelled for job {job_id}")]
    Cancelled { job_id: String },

    /// The provider finished the job with a failure status.
    #[error("job {job_id} failed: {detail}")]
    JobFailed { job_id: String, detail: String },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new Config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new Decode error.
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new Encode error.
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a Request error from a non-success response.
    pub fn request(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Request {
            operation: operation.into(),
            status: Some(status),
            body: body.into(),
        }
    }

    /// Create a Request error for a transport failure with no response.
    pub fn transport(operation: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Request {
            operation: operation.into(),
            status: None,
            body: msg.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Encode(_) | Self::Io(_) => ErrorKind::Io,
            Self::Request { .. } => ErrorKind::Request,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::JobFailed { .. } => ErrorKind::JobFailed,
        }
    }

    /// HTTP status carried by a Request error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
