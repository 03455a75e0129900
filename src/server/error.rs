use std::io;
use thiserror::Error;

use super::http_status::HttpStatus;

/// Everything that can end a single request early.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Unsupported method ('{0}')")]
    UnsupportedMethod(String),
    #[error("Request-URI Too Long")]
    UriTooLong,
    #[error("Too many headers")]
    TooManyHeaders,
    #[error("Line too long")]
    HeaderLineTooLong,
    #[error("Invalid HTTP version ({0})")]
    VersionNotSupported(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Internal server error: {0}")]
    Internal(#[from] io::Error),
}

impl ServeError {
    pub fn status(&self) -> HttpStatus {
        match self {
            Self::BadRequest(_) => HttpStatus::BadRequest,
            Self::Forbidden(_) => HttpStatus::Forbidden,
            Self::NotFound(_) => HttpStatus::NotFound,
            Self::UnsupportedMethod(_) => HttpStatus::NotImplemented,
            Self::UriTooLong => HttpStatus::UriTooLong,
            Self::TooManyHeaders | Self::HeaderLineTooLong => HttpStatus::HeaderFieldsTooLarge,
            Self::VersionNotSupported(_) => HttpStatus::VersionNotSupported,
            Self::Timeout => HttpStatus::RequestTimeout,
            Self::Internal(_) => HttpStatus::InternalServerError,
        }
    }

    /// Text shown to the client. Internal errors don't leak OS details.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => HttpStatus::InternalServerError.text().to_string(),
            other => other.to_string(),
        }
    }

    /// Classifies a failure to open or stat something under the document root.
    pub fn from_fs(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound("File not found".to_string()),
            io::ErrorKind::PermissionDenied => Self::Forbidden("Permission denied".to_string()),
            _ => Self::Internal(err),
        }
    }
}

pub type ServeResult<T> = Result<T, ServeError>;
