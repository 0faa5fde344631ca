//! Handle-based file I/O.
//!
//! This module provides the [`FsHandles`] trait: open a file once, then read
//! and write it through the returned [`Handle`] until it is released.
//!
//! # Lifecycle
//!
//! ```text
//! open / create ──▶ OPEN ──read / write / flush / fsync──▶ OPEN
//!                     │
//!                  release
//!                     ▼
//!                 RELEASED (terminal)
//! ```
//!
//! `release` takes the handle by value, so the released state is enforced by
//! the borrow checker rather than by a registry.
//!
//! # Example
//!
//! ```rust
//! use passthrough_fs::{FsHandles, FsError};
//! use std::path::Path;
//!
//! fn write_then_read<B: FsHandles>(backend: &B) -> Result<Vec<u8>, FsError> {
//!     let path = Path::new("/greeting.txt");
//!     let handle = backend.create(path, 0o644)?;
//!     backend.write(path, &handle, b"hello", 0)?;
//!     backend.release(path, handle)?;
//!
//!     let handle = backend.open(path, libc::O_RDONLY)?;
//!     let data = backend.read(path, &handle, 5, 0)?;
//!     backend.release(path, handle)?;
//!     Ok(data)
//! }
//! ```
//!
//! # Concurrency
//!
//! `read` and `write` seek and then transfer, as two host calls. Two calls on
//! the same handle at the same time race on the shared file position.
//! Transports that issue concurrent I/O on one handle must serialize it
//! themselves.

use std::path::Path;

use crate::{FsError, Handle};

/// Handle-based file operations.
///
/// The `path` argument of [`read`](FsHandles::read),
/// [`write`](FsHandles::write) and [`release`](FsHandles::release) is the
/// virtual path the transport associates with the handle. It is not used to
/// locate the file; it exists so wrappers can report it.
pub trait FsHandles: Send + Sync {
    /// Open `path` with raw `open(2)` flags.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the file doesn't exist and `O_CREAT` is not set
    /// - [`FsError::PermissionDenied`] if access is denied
    fn open(&self, path: &Path, flags: i32) -> Result<Handle, FsError>;

    /// Create (or open) `path` write-only with permission bits `mode`.
    ///
    /// Always `O_WRONLY | O_CREAT`; an existing file is opened without being
    /// truncated.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent directory does not exist
    /// - [`FsError::IsADirectory`] if `path` is a directory
    fn create(&self, path: &Path, mode: u32) -> Result<Handle, FsError>;

    /// Read up to `size` bytes starting at `offset`.
    ///
    /// Returns fewer bytes only at end of file.
    fn read(&self, path: &Path, handle: &Handle, size: usize, offset: u64)
        -> Result<Vec<u8>, FsError>;

    /// Write `data` at `offset`, returning the number of bytes written.
    fn write(&self, path: &Path, handle: &Handle, data: &[u8], offset: u64)
        -> Result<usize, FsError>;

    /// Close the handle.
    ///
    /// Must be called exactly once per `open`/`create`. Close errors from the
    /// host are reported.
    fn release(&self, path: &Path, handle: Handle) -> Result<(), FsError>;
}
