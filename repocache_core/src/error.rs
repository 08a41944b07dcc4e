//! Error types for the repocache engine
//!
//! Errors are split into three categories so that callers can tell a
//! filesystem problem from a contract violation without string matching.

use thiserror::Error;

pub mod internal;
pub mod io;
pub mod validation;

pub use self::io::{IoError, IoErrorKind};
pub use self::validation::ValidationError;
pub use internal::InternalError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the repocache engine
///
/// - I/O errors: filesystem syscalls made by a [`FileStore`](crate::FileStore)
/// - Validation errors: caller contract violations and bad configuration
/// - Internal errors: worker plumbing failures
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal library errors
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io(IoError::from_std(source))
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Validation(ValidationError::invalid_configuration(&err.to_string()))
    }
}

impl Error {
    /// Whether this error came from the filesystem
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
