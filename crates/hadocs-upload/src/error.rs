//! Error types for the upload workflow.

use std::error::Error;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Primary error type for document transport and batch submission.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The request never produced a response.
    #[error("request to {operation} failed")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The server answered with a non-success status.
    #[error("{operation} failed with status {status}: {message}")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode {operation} response")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The batch exceeds the client-side size ceiling.
    #[error("{} of {size} bytes exceeds the {limit} byte upload limit", .filename.as_deref().unwrap_or("upload batch"))]
    PayloadTooLarge {
        /// Offending file, or `None` when the combined batch is too large.
        filename: Option<String>,
        /// Size in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },
    /// A local file could not be read into the batch.
    #[error("failed to read '{path}'")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
}

impl UploadError {
    /// Wrap a transport failure for `operation`.
    pub fn transport(operation: &'static str, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::Transport {
            operation,
            source: source.into(),
        }
    }

    /// Wrap a decode failure for `operation`.
    pub fn decode(operation: &'static str, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::Decode {
            operation,
            source: source.into(),
        }
    }
}

/// Convenience alias for upload results.
pub type UploadResult<T> = Result<T, UploadError>;

/// Failure of a single existence probe. Absorbed by the prober, never surfaced.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Backend call failed.
    #[error("existence check failed")]
    Backend(#[from] UploadError),
    /// Backend call did not finish in time.
    #[error("existence check timed out after {after:?}")]
    TimedOut {
        /// Timeout that elapsed.
        after: Duration,
    },
}

/// Drop surface lifecycle misuse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurfaceError {
    /// A listener registration is already live for this surface.
    #[error("drop surface is already attached")]
    AlreadyAttached,
}
