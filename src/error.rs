//! Error types for passthrough operations.

use std::io;
use std::path::{Path, PathBuf};

/// Passthrough error type.
///
/// Every variant keeps the host [`io::Error`] that caused it, so the original
/// errno survives the trip back to the transport. The variant is only a
/// classification of that errno; [`FsError::errno`] is the value a kernel
/// bridge should reply with.
///
/// # Examples
///
/// ```rust
/// use passthrough_fs::FsError;
/// use std::io;
///
/// let err = FsError::from_io(
///     "getattr",
///     "/missing",
///     io::Error::from_raw_os_error(libc::ENOENT),
/// );
/// assert!(matches!(err, FsError::NotFound { .. }));
/// assert_eq!(err.errno(), libc::ENOENT);
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Path does not exist.
    #[error("{operation}: not found: {}", path.display())]
    NotFound {
        /// The operation that failed.
        operation: &'static str,
        /// The path that was not found.
        path: PathBuf,
        /// The underlying host error.
        #[source]
        source: io::Error,
    },

    /// Host permission check failed.
    #[error("{operation}: permission denied: {}", path.display())]
    PermissionDenied {
        /// The operation that was denied.
        operation: &'static str,
        /// The path where permission was denied.
        path: PathBuf,
        /// The underlying host error.
        #[source]
        source: io::Error,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {}", path.display())]
    AlreadyExists {
        /// The operation that failed.
        operation: &'static str,
        /// The path that already exists.
        path: PathBuf,
        /// The underlying host error.
        #[source]
        source: io::Error,
    },

    /// Directory is not empty when it should be.
    #[error("{operation}: directory not empty: {}", path.display())]
    DirectoryNotEmpty {
        /// The operation that failed.
        operation: &'static str,
        /// The non-empty directory.
        path: PathBuf,
        /// The underlying host error.
        #[source]
        source: io::Error,
    },

    /// Expected a directory but found something else.
    #[error("{operation}: not a directory: {}", path.display())]
    NotADirectory {
        /// The operation that failed.
        operation: &'static str,
        /// The path that is not a directory.
        path: PathBuf,
        /// The underlying host error.
        #[source]
        source: io::Error,
    },

    /// Expected a non-directory but found a directory.
    #[error("{operation}: is a directory: {}", path.display())]
    IsADirectory {
        /// The operation that failed.
        operation: &'static str,
        /// The path that is a directory.
        path: PathBuf,
        /// The underlying host error.
        #[source]
        source: io::Error,
    },

    /// Any other host failure.
    #[error("{operation} failed for {}: {source}", path.display())]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying host error.
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classify a host error for `operation` on `path`.
    ///
    /// The error itself is kept untouched; only the variant is chosen from
    /// its raw OS code.
    pub fn from_io(operation: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.raw_os_error() {
            Some(libc::ENOENT) => FsError::NotFound {
                operation,
                path,
                source,
            },
            Some(libc::EACCES) | Some(libc::EPERM) => FsError::PermissionDenied {
                operation,
                path,
                source,
            },
            Some(libc::EEXIST) => FsError::AlreadyExists {
                operation,
                path,
                source,
            },
            Some(libc::ENOTEMPTY) => FsError::DirectoryNotEmpty {
                operation,
                path,
                source,
            },
            Some(libc::ENOTDIR) => FsError::NotADirectory {
                operation,
                path,
                source,
            },
            Some(libc::EISDIR) => FsError::IsADirectory {
                operation,
                path,
                source,
            },
            _ => FsError::Io {
                operation,
                path,
                source,
            },
        }
    }

    /// Build an error from a raw errno value.
    pub fn from_errno(operation: &'static str, path: impl AsRef<Path>, errno: i32) -> Self {
        Self::from_io(operation, path, io::Error::from_raw_os_error(errno))
    }

    /// The host error this failure came from.
    pub fn io_error(&self) -> &io::Error {
        match self {
            FsError::NotFound { source, .. }
            | FsError::PermissionDenied { source, .. }
            | FsError::AlreadyExists { source, .. }
            | FsError::DirectoryNotEmpty { source, .. }
            | FsError::NotADirectory { source, .. }
            | FsError::IsADirectory { source, .. }
            | FsError::Io { source, .. } => source,
        }
    }

    /// The errno to report to the kernel.
    ///
    /// This is the host code unchanged. Errors synthesized without an OS
    /// code report `EIO`.
    pub fn errno(&self) -> i32 {
        self.io_error().raw_os_error().unwrap_or(libc::EIO)
    }

    /// The operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            FsError::NotFound { operation, .. }
            | FsError::PermissionDenied { operation, .. }
            | FsError::AlreadyExists { operation, .. }
            | FsError::DirectoryNotEmpty { operation, .. }
            | FsError::NotADirectory { operation, .. }
            | FsError::IsADirectory { operation, .. }
            | FsError::Io { operation, .. } => operation,
        }
    }
}
