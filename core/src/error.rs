//! Error types for the select client.
//!
//! # Design
//! Variants are fine-grained for debugging, but callers usually only need to
//! know which of three things went wrong: they passed a bad argument, the
//! HTTP call failed, or the server answered with a body we could not read.
//! `QueryError::kind` collapses the variants onto those three `ErrorKind`s.

/// Coarse classification of a `QueryError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any network call was made.
    InvalidArgument,
    /// Non-2xx status or a transport-level failure.
    RequestFailed,
    /// The call succeeded but the body lacks the expected shape.
    MalformedResponse,
}

/// Errors returned by `Collection` operations and their `build_*`/`parse_*`
/// halves.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// DNS, connection refused, timeout and anything else the transport
    /// reports before a status line arrives.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            QueryError::HttpStatus { .. } | QueryError::Transport(_) => ErrorKind::RequestFailed,
            QueryError::MalformedResponse(_) => ErrorKind::MalformedResponse,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
