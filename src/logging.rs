//! # Tracing Middleware
//!
//! [`TracingLayer`] wraps any dispatcher in [`Traced`], which emits one
//! `debug` event per verb naming the call and its arguments, then delegates
//! unchanged. Failures get a second `debug` event carrying the errno.
//!
//! The wrapper never alters arguments, results or errors. Whether anything
//! is printed is decided by the installed `tracing` subscriber.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::{
    FileAttr, FsDir, FsError, FsHandles, FsLink, FsOps, FsPermissions, FsRead, FsStats, FsSync,
    FsWrite, Handle, Layer, ReadDirIter, StatFs,
};

/// Layer producing [`Traced`] dispatchers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLayer {
    _private: (),
}

impl TracingLayer {
    /// Create a tracing layer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: FsOps> Layer<B> for TracingLayer {
    type Backend = Traced<B>;

    fn layer(self, backend: B) -> Self::Backend {
        Traced { inner: backend }
    }
}

/// A dispatcher that logs each verb before delegating to `inner`.
pub struct Traced<B> {
    inner: B,
}

impl<B> Traced<B> {
    /// The wrapped dispatcher.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Unwrap, returning the inner dispatcher.
    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B: fmt::Debug> fmt::Debug for Traced<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traced").field("inner", &self.inner).finish()
    }
}

fn logged<T>(result: Result<T, FsError>) -> Result<T, FsError> {
    if let Err(err) = &result {
        debug!(op = err.operation(), errno = err.errno(), "{err}");
    }
    result
}

impl<B: FsRead> FsRead for Traced<B> {
    fn access(&self, path: &Path, mask: i32) -> Result<(), FsError> {
        debug!("access({}, {mask:#o})", path.display());
        logged(self.inner.access(path, mask))
    }

    fn getattr(&self, path: &Path) -> Result<FileAttr, FsError> {
        debug!("getattr({})", path.display());
        logged(self.inner.getattr(path))
    }
}

impl<B: FsDir> FsDir for Traced<B> {
    fn readdir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        debug!("readdir({})", path.display());
        logged(self.inner.readdir(path))
    }

    fn mkdir(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        debug!("mkdir({}, {mode:#o})", path.display());
        logged(self.inner.mkdir(path, mode))
    }

    fn rmdir(&self, path: &Path) -> Result<(), FsError> {
        debug!("rmdir({})", path.display());
        logged(self.inner.rmdir(path))
    }
}

impl<B: FsWrite> FsWrite for Traced<B> {
    fn mknod(&self, path: &Path, mode: u32, dev: u64) -> Result<(), FsError> {
        debug!("mknod({}, {mode:#o}, {dev})", path.display());
        logged(self.inner.mknod(path, mode, dev))
    }

    fn unlink(&self, path: &Path) -> Result<(), FsError> {
        debug!("unlink({})", path.display());
        logged(self.inner.unlink(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        debug!("rename({}, {})", from.display(), to.display());
        logged(self.inner.rename(from, to))
    }

    fn truncate(&self, path: &Path, size: u64) -> Result<(), FsError> {
        debug!("truncate({}, {size})", path.display());
        logged(self.inner.truncate(path, size))
    }
}

impl<B: FsLink> FsLink for Traced<B> {
    fn symlink(&self, name: &Path, target: &Path) -> Result<(), FsError> {
        debug!("symlink({}, {})", name.display(), target.display());
        logged(self.inner.symlink(name, target))
    }

    fn link(&self, original: &Path, link: &Path) -> Result<(), FsError> {
        debug!("link({}, {})", original.display(), link.display());
        logged(self.inner.link(original, link))
    }

    fn readlink(&self, path: &Path) -> Result<PathBuf, FsError> {
        debug!("readlink({})", path.display());
        logged(self.inner.readlink(path))
    }
}

impl<B: FsPermissions> FsPermissions for Traced<B> {
    fn chmod(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        debug!("chmod({}, {mode:#o})", path.display());
        logged(self.inner.chmod(path, mode))
    }

    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError> {
        debug!("chown({}, {uid:?}, {gid:?})", path.display());
        logged(self.inner.chown(path, uid, gid))
    }

    fn utimens(
        &self,
        path: &Path,
        times: Option<(SystemTime, SystemTime)>,
    ) -> Result<(), FsError> {
        debug!("utimens({}, {times:?})", path.display());
        logged(self.inner.utimens(path, times))
    }
}

impl<B: FsHandles> FsHandles for Traced<B> {
    fn open(&self, path: &Path, flags: i32) -> Result<Handle, FsError> {
        debug!("open({}, {flags:#x})", path.display());
        logged(self.inner.open(path, flags))
    }

    fn create(&self, path: &Path, mode: u32) -> Result<Handle, FsError> {
        debug!("create({}, {mode:#o})", path.display());
        logged(self.inner.create(path, mode))
    }

    fn read(
        &self,
        path: &Path,
        handle: &Handle,
        size: usize,
        offset: u64,
    ) -> Result<Vec<u8>, FsError> {
        debug!("read({}, {size}, {offset})", path.display());
        logged(self.inner.read(path, handle, size, offset))
    }

    fn write(
        &self,
        path: &Path,
        handle: &Handle,
        data: &[u8],
        offset: u64,
    ) -> Result<usize, FsError> {
        debug!("write({}, {} bytes, {offset})", path.display(), data.len());
        logged(self.inner.write(path, handle, data, offset))
    }

    fn release(&self, path: &Path, handle: Handle) -> Result<(), FsError> {
        debug!("release({})", path.display());
        logged(self.inner.release(path, handle))
    }
}

impl<B: FsSync> FsSync for Traced<B> {
    fn flush(&self, path: &Path, handle: &Handle) -> Result<(), FsError> {
        debug!("flush({})", path.display());
        logged(self.inner.flush(path, handle))
    }

    fn fsync(&self, path: &Path, datasync: bool, handle: &Handle) -> Result<(), FsError> {
        debug!("fsync({}, datasync={datasync})", path.display());
        logged(self.inner.fsync(path, datasync, handle))
    }
}

impl<B: FsStats> FsStats for Traced<B> {
    fn statfs(&self, path: &Path) -> Result<StatFs, FsError> {
        debug!("statfs({})", path.display());
        logged(self.inner.statfs(path))
    }
}
