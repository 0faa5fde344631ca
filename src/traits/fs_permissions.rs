//! Ownership, mode and timestamp changes.

use std::path::Path;
use std::time::SystemTime;

use crate::FsError;

/// Attribute changes on a path.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Note
///
/// Reading attributes is done via [`FsRead::getattr`](super::FsRead::getattr).
pub trait FsPermissions: Send + Sync {
    /// Set the permission bits of `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::PermissionDenied`] if the caller does not own the path
    fn chmod(&self, path: &Path, mode: u32) -> Result<(), FsError>;

    /// Change the owner and/or group of `path`. `None` leaves that id
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::PermissionDenied`] if the change is not allowed
    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError>;

    /// Set access and modification times.
    ///
    /// `times` is `(atime, mtime)`. `None` sets both to the current time.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn utimens(&self, path: &Path, times: Option<(SystemTime, SystemTime)>)
        -> Result<(), FsError>;
}
