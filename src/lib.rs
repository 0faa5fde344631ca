//! # passthrough-fs
//!
//! A userspace filesystem that mirrors one local directory at a mount point.
//!
//! Every operation on a virtual path is resolved to the same relative path
//! under a backing root and performed on the host; results and error codes
//! come back unchanged. There is no cache, no translation and no policy.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use passthrough_fs::{FsDir, FsHandles, FsRead, MountContext, Passthrough};
//! use std::path::Path;
//!
//! let backing = tempfile::tempdir().unwrap();
//! let fs = Passthrough::new(MountContext::new(backing.path()).unwrap());
//!
//! let handle = fs.create(Path::new("/notes.txt"), 0o644).unwrap();
//! fs.write(Path::new("/notes.txt"), &handle, b"hello", 0).unwrap();
//! fs.release(Path::new("/notes.txt"), handle).unwrap();
//!
//! assert_eq!(fs.getattr(Path::new("/notes.txt")).unwrap().size, 5);
//! for entry in fs.readdir(Path::new("/")).unwrap() {
//!     println!("{:?}", entry.unwrap().name);
//! }
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`MountContext`] | The backing root and virtual-to-host path resolution |
//! | [`Passthrough`] | The dispatcher: one host call per verb |
//! | [`FsOps`] | The full verb set, split into component traits |
//! | [`TracingLayer`] | Middleware that logs every verb through `tracing` |
//! | [`FsError`] | Typed error carrying the host errno |
//! | [`FuseAdapter`] | Serves any [`FsOps`] over FUSE (feature `fuse`) |
//!
//! ---
//!
//! ## Composition
//!
//! ```text
//! kernel ──▶ FuseAdapter ──▶ Traced<Passthrough> ──▶ Passthrough ──▶ host fs
//!             inodes, fhs      debug log per verb      resolve + call
//! ```
//!
//! The adapter and the tracing layer are written against [`FsOps`], so the
//! dispatcher can be tested and embedded without either.
//!
//! ---
//!
//! ## Error Handling
//!
//! ```rust
//! use passthrough_fs::FsError;
//!
//! let err = FsError::from_errno("getattr", "/missing", libc::ENOENT);
//! assert!(matches!(err, FsError::NotFound { .. }));
//! assert_eq!(err.errno(), libc::ENOENT);
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! All verb traits require `Send + Sync` and take `&self`. [`Passthrough`]
//! holds only the immutable [`MountContext`], so it can be shared freely.
//! Concurrent reads or writes on the *same* [`Handle`] race on its file
//! position; callers that need ordering must serialize them.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `fuse` | [`FuseAdapter`] and `fuser` mount options |
//! | `cli` (default) | The `passthroughfs` binary; implies `fuse` |
//! | `serde` | Serialization for [`FileAttr`], [`StatFs`], [`FileType`], [`MountOptions`] |

mod config;
mod error;
#[cfg(feature = "fuse")]
mod fuse;
mod inode;
mod layer;
mod logging;
mod passthrough;
mod path_resolver;
mod sys;
mod traits;
mod types;

// Public re-exports - error types
pub use error::FsError;

// Public re-exports - core types
pub use types::{DirEntry, FileAttr, FileType, Handle, ROOT_INODE, StatFs, unix_time};

// Public re-exports - verb traits
pub use traits::{
    FsDir, FsHandles, FsLink, FsOps, FsPermissions, FsRead, FsStats, FsSync, FsWrite, ReadDirIter,
};

// Public re-exports - path resolution and dispatch
pub use passthrough::Passthrough;
pub use path_resolver::MountContext;

// Public re-exports - middleware
pub use layer::{Layer, LayerExt};
pub use logging::{Traced, TracingLayer};

// Public re-exports - transport support
pub use config::{DEFAULT_FSNAME, MountOptions, prepare_mount_point};
pub use inode::InodeTable;

#[cfg(feature = "fuse")]
pub use fuse::{FuseAdapter, TTL, setattr_times, to_fuser_attr, to_fuser_kind};
