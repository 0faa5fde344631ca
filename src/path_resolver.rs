//! # Mount Context and Path Resolution
//!
//! Maps virtual paths (as seen through the mount point) onto the backing
//! directory.
//!
//! ## Responsibility
//! - Hold the validated, absolute backing root
//! - Translate virtual paths to host paths, and host paths under the root
//!   back to virtual paths
//!
//! ## Limitations
//!
//! Resolution is lexical. A virtual path containing `..` segments is joined
//! as-is and may address files outside the root. The kernel never sends such
//! paths through a mount, so only direct callers of the dispatcher can do
//! this; they are trusted.
//!
//! ## Usage
//!
//! ```rust
//! use passthrough_fs::MountContext;
//! use std::path::Path;
//!
//! let backing = tempfile::tempdir().unwrap();
//! let ctx = MountContext::new(backing.path()).unwrap();
//!
//! assert_eq!(ctx.resolve(Path::new("/")), ctx.root());
//! assert_eq!(ctx.resolve(Path::new("/a/b")), ctx.root().join("a/b"));
//! ```

use std::path::{Path, PathBuf};

use crate::FsError;

/// Immutable mount configuration: the backing root directory.
///
/// Created once at startup and owned by the dispatcher for the rest of the
/// process. There is no way to change the root afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountContext {
    root: PathBuf,
}

impl MountContext {
    /// Validate `root` and build a context for it.
    ///
    /// The root is made absolute (symlinks in it are resolved) so that every
    /// resolved path is absolute too.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `root` does not exist
    /// - [`FsError::NotADirectory`] if `root` is not a directory
    pub fn new(root: impl AsRef<Path>) -> Result<Self, FsError> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|e| FsError::from_io("mount", root, e))?;
        let meta = std::fs::metadata(&root).map_err(|e| FsError::from_io("mount", &root, e))?;
        if !meta.is_dir() {
            return Err(FsError::from_errno("mount", &root, libc::ENOTDIR));
        }
        Ok(Self { root })
    }

    /// The absolute backing root.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a virtual path to its backing path.
    ///
    /// Strips exactly one leading `/` and joins the rest onto the root.
    /// Never touches the filesystem and never fails.
    pub fn resolve(&self, virtual_path: &Path) -> PathBuf {
        let relative = virtual_path.strip_prefix("/").unwrap_or(virtual_path);
        if relative.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }

    /// Map a host path back into the virtual namespace.
    ///
    /// Returns `/` followed by the part of `host_path` below the root, or
    /// `None` if `host_path` is not under the root.
    pub fn to_virtual(&self, host_path: &Path) -> Option<PathBuf> {
        host_path
            .strip_prefix(&self.root)
            .ok()
            .map(|rest| Path::new("/").join(rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> (tempfile::TempDir, MountContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = MountContext::new(dir.path()).unwrap();
        (dir, ctx)
    }

    #[test]
    fn root_resolves_to_root() {
        let (_dir, ctx) = ctx();
        assert_eq!(ctx.resolve(Path::new("/")), ctx.root());
    }

    #[test]
    fn resolution_is_deterministic() {
        let (_dir, ctx) = ctx();
        let p = Path::new("/some/deep/file.txt");
        assert_eq!(ctx.resolve(p), ctx.resolve(p));
        assert_eq!(ctx.resolve(p), ctx.root().join("some/deep/file.txt"));
    }

    #[test]
    fn absolute_virtual_path_never_overrides_root() {
        let (_dir, ctx) = ctx();
        let resolved = ctx.resolve(Path::new("/etc/passwd"));
        assert!(resolved.starts_with(ctx.root()));
    }

    #[test]
    fn relative_virtual_path_is_joined() {
        let (_dir, ctx) = ctx();
        assert_eq!(ctx.resolve(Path::new("a")), ctx.root().join("a"));
    }

    #[test]
    fn missing_paths_still_resolve() {
        let (_dir, ctx) = ctx();
        let resolved = ctx.resolve(Path::new("/does/not/exist"));
        assert!(!resolved.exists());
        assert_eq!(resolved, ctx.root().join("does/not/exist"));
    }

    #[test]
    fn parent_segments_are_not_bounded() {
        let (_dir, ctx) = ctx();
        let resolved = ctx.resolve(Path::new("/../escape"));
        assert_eq!(resolved, ctx.root().join("../escape"));
    }

    #[test]
    fn to_virtual_strips_root() {
        let (_dir, ctx) = ctx();
        let host = ctx.root().join("x/y");
        assert_eq!(ctx.to_virtual(&host), Some(PathBuf::from("/x/y")));
        assert_eq!(ctx.to_virtual(ctx.root()), Some(PathBuf::from("/")));
    }

    #[test]
    fn to_virtual_outside_root_is_none() {
        let (_dir, ctx) = ctx();
        assert_eq!(ctx.to_virtual(Path::new("/definitely/elsewhere")), None);
    }

    #[test]
    fn missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = MountContext::new(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"").unwrap();
        let err = MountContext::new(&file).unwrap_err();
        assert!(matches!(err, FsError::NotADirectory { .. }));
    }
}
