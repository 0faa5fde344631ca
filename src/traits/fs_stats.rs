//! Filesystem statistics operations.

use std::path::Path;

use crate::{FsError, StatFs};

/// Filesystem statistics operations.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsStats`.
pub trait FsStats: Send + Sync {
    /// Statistics of the host filesystem holding `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn statfs(&self, path: &Path) -> Result<StatFs, FsError>;
}
