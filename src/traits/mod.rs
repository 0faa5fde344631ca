//! # Filesystem Verb Traits
//!
//! The verb contract every dispatcher implements, split by concern.
//!
//! ## Quick Reference
//!
//! | Trait | Verbs |
//! |-------|-------|
//! | [`FsRead`] | `access`, `getattr` |
//! | [`FsDir`] | `readdir`, `mkdir`, `rmdir` |
//! | [`FsWrite`] | `mknod`, `unlink`, `rename`, `truncate` |
//! | [`FsLink`] | `symlink`, `link`, `readlink` |
//! | [`FsPermissions`] | `chmod`, `chown`, `utimens` |
//! | [`FsHandles`] | `open`, `create`, `read`, `write`, `release` |
//! | [`FsSync`] | `flush`, `fsync` |
//! | [`FsStats`] | `statfs` |
//!
//! [`FsOps`] is the full set and has a blanket implementation: implement the
//! components and the composite comes for free. Transports and middleware
//! are written against [`FsOps`].
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Methods take `&self`, so a dispatcher
//! can be shared across transport threads without locking at the call site.

mod fs_dir;
mod fs_handles;
mod fs_link;
mod fs_permissions;
mod fs_read;
mod fs_stats;
mod fs_sync;
mod fs_write;

pub use fs_dir::{FsDir, ReadDirIter};
pub use fs_handles::FsHandles;
pub use fs_link::FsLink;
pub use fs_permissions::FsPermissions;
pub use fs_read::FsRead;
pub use fs_stats::FsStats;
pub use fs_sync::FsSync;
pub use fs_write::FsWrite;

/// The complete filesystem verb set.
///
/// # Blanket Implementation
///
/// Automatically implemented for any type implementing all component traits.
///
/// # Example
///
/// ```rust
/// use passthrough_fs::{FsError, FsOps};
/// use std::path::Path;
///
/// fn size_of<B: FsOps>(fs: &B, path: &Path) -> Result<u64, FsError> {
///     Ok(fs.getattr(path)?.size)
/// }
/// ```
pub trait FsOps:
    FsRead + FsDir + FsWrite + FsLink + FsPermissions + FsHandles + FsSync + FsStats
{
}

impl<T> FsOps for T where
    T: FsRead + FsDir + FsWrite + FsLink + FsPermissions + FsHandles + FsSync + FsStats
{
}
