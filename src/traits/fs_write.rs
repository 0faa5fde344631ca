//! Namespace mutations that are not links or directories.

use std::path::Path;

use crate::FsError;

/// Node creation, removal, renaming and truncation.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWrite`.
pub trait FsWrite: Send + Sync {
    /// Create a filesystem node (regular file, device, fifo, socket).
    ///
    /// `mode` carries both the type bits and the permission bits; `dev` is
    /// the device number for block and character devices.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if the path already exists
    /// - [`FsError::PermissionDenied`] if creating devices is not allowed
    fn mknod(&self, path: &Path, mode: u32, dev: u64) -> Result<(), FsError>;

    /// Remove a non-directory entry.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::IsADirectory`] if the path is a directory (Linux reports
    ///   `EISDIR`; some hosts report `EPERM`)
    fn unlink(&self, path: &Path) -> Result<(), FsError>;

    /// Rename `from` to `to`, replacing `to` if the host allows it.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `from` does not exist
    /// - [`FsError::DirectoryNotEmpty`] if `to` is a non-empty directory
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Set the length of the file at `path`.
    ///
    /// Opens the file by name; any handles already open on it are not used
    /// or affected beyond seeing the new length.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the file does not exist
    /// - [`FsError::IsADirectory`] if the path is a directory
    fn truncate(&self, path: &Path, size: u64) -> Result<(), FsError>;
}
