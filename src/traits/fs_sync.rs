//! Durability operations on open handles.

use std::path::Path;

use crate::{FsError, Handle};

/// Durability operations on open handles.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsSync`.
pub trait FsSync: Send + Sync {
    /// Force pending writes on `handle` to stable storage.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] for underlying I/O errors
    fn flush(&self, path: &Path, handle: &Handle) -> Result<(), FsError>;

    /// Synchronize `handle`.
    ///
    /// `datasync` requests a data-only sync. Implementations may treat it as
    /// a full sync; the passthrough backend always does.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] for underlying I/O errors
    fn fsync(&self, path: &Path, datasync: bool, handle: &Handle) -> Result<(), FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_sync_is_object_safe() {
        fn _check(_: &dyn FsSync) {}
    }

    #[test]
    fn fs_sync_requires_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        fn _check<T: FsSync>() {
            _assert_send_sync::<T>();
        }
    }
}
