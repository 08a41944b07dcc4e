//! Filesystem error types

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A failed filesystem call on a cache file or directory
#[derive(Error, Debug)]
#[error("{kind}{}{}", display_path(.path), display_source(.source))]
pub struct IoError {
    pub kind: IoErrorKind,
    /// Cache file or directory the call was made on
    pub path: Option<PathBuf>,
    #[source]
    pub source: Option<io::Error>,
}

/// What went wrong, coarse enough to branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    FileNotFound,
    PermissionDenied,
    Other,
}

impl fmt::Display for IoErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FileNotFound => "File not found",
            Self::PermissionDenied => "Permission denied",
            Self::Other => "I/O error",
        })
    }
}

impl From<io::ErrorKind> for IoErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Self::FileNotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Other,
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" on {}", p.display()))
        .unwrap_or_default()
}

fn display_source(source: &Option<io::Error>) -> String {
    source
        .as_ref()
        .map(|e| format!(": {e}"))
        .unwrap_or_default()
}

impl IoError {
    pub fn file_not_found(path: &Path) -> Self {
        Self {
            kind: IoErrorKind::FileNotFound,
            path: Some(path.to_path_buf()),
            source: None,
        }
    }

    pub fn permission_denied(path: &Path, source: io::Error) -> Self {
        Self {
            kind: IoErrorKind::PermissionDenied,
            path: Some(path.to_path_buf()),
            source: Some(source),
        }
    }

    /// Wrap a `std::io::Error`, classifying it by its kind
    pub fn from_std(source: io::Error) -> Self {
        Self {
            kind: source.kind().into(),
            path: None,
            source: Some(source),
        }
    }

    /// Attach the path the failed call was made on
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.to_path_buf());
        self
    }
}
