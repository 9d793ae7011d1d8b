use thiserror::Error;

use crate::message::Status;

/// Error taxonomy surfaced by the message engine. Parse-level failures map
/// onto HTTP status codes via [`Error::status`]; I/O and timeout failures
/// close the connection instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Grammar or semantic violation of HTTP framing or headers.
    #[error("bad message: {0}")]
    BadMessage(String),

    /// A header value names a feature outside the supported vocabulary.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Non-HTTP protocol or a version other than 1.1 on the wire.
    #[error("HTTP version not supported: {0}")]
    VersionNotSupported(String),

    /// The router found no matching path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Handler-raised error carrying its own status code.
    #[error("{reason} ({status})")]
    Status { status: Status, reason: String },

    /// An I/O deadline elapsed.
    #[error("timed out while {0}")]
    Timeout(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Programmer error in builder usage. Never sent on the wire.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// The HTTP status this error translates to on the responder path.
    pub fn status(&self) -> Status {
        match self {
            Error::BadMessage(_) => Status::BAD_REQUEST,
            Error::NotImplemented(_) => Status::NOT_IMPLEMENTED,
            Error::VersionNotSupported(_) => Status::HTTP_VERSION_NOT_SUPPORTED,
            Error::NotFound(_) => Status::NOT_FOUND,
            Error::Status { status, .. } => *status,
            _ => Status::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the connection is beyond a best-effort error response
    /// (I/O failure, deadline elapsed).
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn bad_message(msg: impl Into<String>) -> Error {
    Error::BadMessage(msg.into())
}

pub(crate) fn not_implemented(msg: impl Into<String>) -> Error {
    Error::NotImplemented(msg.into())
}
