//! Symlink and hard link operations.

use std::path::{Path, PathBuf};

use crate::FsError;

/// Symlink and hard link operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsLink`.
pub trait FsLink: Send + Sync {
    /// Create a symbolic link.
    ///
    /// # Arguments
    ///
    /// * `name` - The link's contents, stored verbatim (not resolved)
    /// * `target` - The virtual path at which the link is created
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `target` already exists
    /// - [`FsError::NotFound`] if the parent of `target` does not exist
    fn symlink(&self, name: &Path, target: &Path) -> Result<(), FsError>;

    /// Create a hard link at `link` to the existing entry `original`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `original` does not exist
    /// - [`FsError::AlreadyExists`] if `link` already exists
    fn link(&self, original: &Path, link: &Path) -> Result<(), FsError>;

    /// Read the target of a symbolic link.
    ///
    /// Absolute targets that point inside the backing root are rewritten to
    /// the equivalent virtual path; all other targets are returned as stored.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::Io`] with `EINVAL` if `path` is not a symlink
    fn readlink(&self, path: &Path) -> Result<PathBuf, FsError>;
}
