//! Metadata queries.

use std::path::Path;

use crate::{FileAttr, FsError};

/// Metadata queries against a virtual path.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods take `&self` so a
/// transport can call them from several threads at once.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsRead`.
pub trait FsRead: Send + Sync {
    /// Check whether the caller may access `path` with `mask`
    /// (`F_OK`, or any of `R_OK | W_OK | X_OK`).
    ///
    /// # Errors
    ///
    /// - [`FsError::PermissionDenied`] on any failure, carrying `EACCES`
    ///   whatever the host reported
    fn access(&self, path: &Path, mask: i32) -> Result<(), FsError>;

    /// Get attributes of `path` without following a final symlink.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if a parent component is not a directory
    fn getattr(&self, path: &Path) -> Result<FileAttr, FsError>;
}
