//! # FUSE Transport
//!
//! [`FuseAdapter`] drives any [`FsOps`] dispatcher from the kernel's FUSE
//! protocol via `fuser`. It owns the two pieces of state the path-based
//! dispatcher does not: the [`InodeTable`] and the table of open handles keyed
//! by the `u64` file handle given to the kernel.
//!
//! Each request is resolved to a virtual path, forwarded to the dispatcher,
//! and answered with the result or with [`FsError::errno`].
//!
//! `fuser` calls the adapter from a single session thread through `&mut self`,
//! so neither table is locked.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::raw::c_int;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use fuser::{
    Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use tracing::warn;

use crate::{FileAttr, FileType, FsError, FsOps, Handle, InodeTable, StatFs};

/// Attribute and entry cache lifetime handed to the kernel.
pub const TTL: Duration = Duration::from_secs(1);

const ROOT: &str = "/";

struct OpenFile {
    path: PathBuf,
    handle: Handle,
}

/// `fuser::Filesystem` implementation over a path-based dispatcher.
pub struct FuseAdapter<B> {
    fs: B,
    inodes: InodeTable,
    files: HashMap<u64, OpenFile>,
    next_fh: u64,
}

impl<B: FsOps> FuseAdapter<B> {
    /// Wrap `fs` for mounting.
    pub fn new(fs: B) -> Self {
        Self {
            fs,
            inodes: InodeTable::new(),
            files: HashMap::new(),
            next_fh: 1,
        }
    }

    /// The wrapped dispatcher.
    pub fn backend(&self) -> &B {
        &self.fs
    }

    /// The inode table.
    pub fn inodes(&self) -> &InodeTable {
        &self.inodes
    }

    /// Number of handles currently open through this adapter.
    pub fn open_handles(&self) -> usize {
        self.files.len()
    }

    fn path(&self, ino: u64) -> Result<PathBuf, c_int> {
        self.inodes
            .path(ino)
            .map(Path::to_path_buf)
            .ok_or(libc::ENOENT)
    }

    fn child(&self, parent: u64, name: &OsStr) -> Result<PathBuf, c_int> {
        self.inodes.child_path(parent, name).ok_or(libc::ENOENT)
    }

    fn file(&self, fh: u64) -> Result<&OpenFile, c_int> {
        self.files.get(&fh).ok_or(libc::EBADF)
    }

    fn store(&mut self, path: PathBuf, handle: Handle) -> u64 {
        let fh = self.next_fh;
        self.next_fh += 1;
        self.files.insert(fh, OpenFile { path, handle });
        fh
    }

    /// `getattr` on `path`, numbering it in the inode table.
    fn entry(&mut self, path: &Path) -> Result<fuser::FileAttr, c_int> {
        let attr = self.fs.getattr(path).map_err(errno)?;
        let ino = self.inodes.lookup_or_insert(path);
        Ok(to_fuser_attr(ino, &attr))
    }

    fn attr(&self, ino: u64) -> Result<fuser::FileAttr, c_int> {
        let path = self.path(ino)?;
        let attr = self.fs.getattr(&path).map_err(errno)?;
        Ok(to_fuser_attr(ino, &attr))
    }

    /// `getattr`, answered from the open file when the kernel names one.
    ///
    /// An open file stays reachable through its handle after its path is
    /// unlinked, so `fstat` keeps working.
    fn do_getattr(&self, ino: u64, fh: Option<u64>) -> Result<fuser::FileAttr, c_int> {
        if let Some(file) = fh.and_then(|fh| self.files.get(&fh)) {
            let meta = file
                .handle
                .file()
                .metadata()
                .map_err(|e| FsError::from_io("getattr", &file.path, e).errno())?;
            return Ok(to_fuser_attr(ino, &FileAttr::from(&meta)));
        }
        self.attr(ino)
    }

    fn do_lookup(&mut self, parent: u64, name: &OsStr) -> Result<fuser::FileAttr, c_int> {
        let path = self.child(parent, name)?;
        self.entry(&path)
    }

    #[allow(clippy::too_many_arguments)]
    fn do_setattr(
        &mut self,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
    ) -> Result<fuser::FileAttr, c_int> {
        let path = self.path(ino)?;
        if let Some(mode) = mode {
            self.fs.chmod(&path, mode).map_err(errno)?;
        }
        if uid.is_some() || gid.is_some() {
            self.fs.chown(&path, uid, gid).map_err(errno)?;
        }
        if let Some(size) = size {
            self.fs.truncate(&path, size).map_err(errno)?;
        }
        let times = setattr_times(atime, mtime, SystemTime::now(), || self.fs.getattr(&path))
            .map_err(errno)?;
        if let Some(times) = times {
            self.fs.utimens(&path, Some(times)).map_err(errno)?;
        }
        self.attr(ino)
    }

    fn do_readlink(&self, ino: u64) -> Result<PathBuf, c_int> {
        let path = self.path(ino)?;
        self.fs.readlink(&path).map_err(errno)
    }

    fn do_mknod(
        &mut self,
        parent: u64,
        name: &OsStr,
        mode: u32,
        rdev: u32,
    ) -> Result<fuser::FileAttr, c_int> {
        let path = self.child(parent, name)?;
        self.fs.mknod(&path, mode, u64::from(rdev)).map_err(errno)?;
        self.entry(&path)
    }

    fn do_mkdir(&mut self, parent: u64, name: &OsStr, mode: u32) -> Result<fuser::FileAttr, c_int> {
        let path = self.child(parent, name)?;
        self.fs.mkdir(&path, mode).map_err(errno)?;
        self.entry(&path)
    }

    fn do_unlink(&mut self, parent: u64, name: &OsStr) -> Result<(), c_int> {
        let path = self.child(parent, name)?;
        self.fs.unlink(&path).map_err(errno)?;
        self.inodes.remove(&path);
        Ok(())
    }

    fn do_rmdir(&mut self, parent: u64, name: &OsStr) -> Result<(), c_int> {
        let path = self.child(parent, name)?;
        self.fs.rmdir(&path).map_err(errno)?;
        self.inodes.remove(&path);
        Ok(())
    }

    fn do_symlink(
        &mut self,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
    ) -> Result<fuser::FileAttr, c_int> {
        let link = self.child(parent, link_name)?;
        self.fs.symlink(target, &link).map_err(errno)?;
        self.entry(&link)
    }

    fn do_rename(
        &mut self,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
    ) -> Result<(), c_int> {
        if flags != 0 {
            return Err(libc::EINVAL);
        }
        let from = self.child(parent, name)?;
        let to = self.child(newparent, newname)?;
        self.fs.rename(&from, &to).map_err(errno)?;
        self.inodes.rename(&from, &to);
        Ok(())
    }

    fn do_link(
        &mut self,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
    ) -> Result<fuser::FileAttr, c_int> {
        let original = self.path(ino)?;
        let link = self.child(newparent, newname)?;
        self.fs.link(&original, &link).map_err(errno)?;
        // Each name gets its own inode so it outlives an unlink of the other.
        self.entry(&link)
    }

    fn do_open(&mut self, ino: u64, flags: i32) -> Result<u64, c_int> {
        let path = self.path(ino)?;
        let handle = self.fs.open(&path, flags).map_err(errno)?;
        Ok(self.store(path, handle))
    }

    fn do_read(&self, fh: u64, offset: i64, size: u32) -> Result<Vec<u8>, c_int> {
        let offset = u64::try_from(offset).map_err(|_| libc::EINVAL)?;
        let file = self.file(fh)?;
        self.fs
            .read(&file.path, &file.handle, size as usize, offset)
            .map_err(errno)
    }

    fn do_write(&self, fh: u64, offset: i64, data: &[u8]) -> Result<u32, c_int> {
        let offset = u64::try_from(offset).map_err(|_| libc::EINVAL)?;
        let file = self.file(fh)?;
        let written = self
            .fs
            .write(&file.path, &file.handle, data, offset)
            .map_err(errno)?;
        u32::try_from(written).map_err(|_| libc::EIO)
    }

    fn do_flush(&self, fh: u64) -> Result<(), c_int> {
        let file = self.file(fh)?;
        self.fs.flush(&file.path, &file.handle).map_err(errno)
    }

    fn do_release(&mut self, fh: u64) -> Result<(), c_int> {
        let file = self.files.remove(&fh).ok_or(libc::EBADF)?;
        self.fs.release(&file.path, file.handle).map_err(errno)
    }

    fn do_fsync(&self, fh: u64, datasync: bool) -> Result<(), c_int> {
        let file = self.file(fh)?;
        self.fs
            .fsync(&file.path, datasync, &file.handle)
            .map_err(errno)
    }

    /// The directory listing as `(ino, kind, name)` triples, `.` and `..` first.
    ///
    /// Listing does not pin inodes: names the kernel has not looked up are
    /// reported with their host inode number.
    fn do_readdir(&self, ino: u64) -> Result<Vec<(u64, fuser::FileType, PathBuf)>, c_int> {
        let dir = self.path(ino)?;
        let parent_ino = dir
            .parent()
            .and_then(|parent| self.inodes.inode(parent))
            .unwrap_or(ino);

        let mut listing = Vec::new();
        for entry in self.fs.readdir(&dir).map_err(errno)? {
            let entry = entry.map_err(errno)?;
            let entry_ino = match entry.name.as_bytes() {
                b"." => ino,
                b".." => parent_ino,
                _ => self
                    .inodes
                    .inode(&dir.join(&entry.name))
                    .unwrap_or(entry.inode),
            };
            listing.push((
                entry_ino,
                to_fuser_kind(entry.file_type),
                PathBuf::from(entry.name),
            ));
        }
        Ok(listing)
    }

    fn do_statfs(&self) -> Result<StatFs, c_int> {
        self.fs.statfs(Path::new(ROOT)).map_err(errno)
    }

    fn do_access(&self, ino: u64, mask: i32) -> Result<(), c_int> {
        let path = self.path(ino)?;
        self.fs.access(&path, mask).map_err(errno)
    }

    fn do_create(
        &mut self,
        parent: u64,
        name: &OsStr,
        mode: u32,
    ) -> Result<(fuser::FileAttr, u64), c_int> {
        let path = self.child(parent, name)?;
        let handle = self.fs.create(&path, mode).map_err(errno)?;
        let fh = self.store(path.clone(), handle);
        match self.entry(&path) {
            Ok(attr) => Ok((attr, fh)),
            Err(e) => {
                if let Err(close) = self.do_release(fh) {
                    warn!(fh, errno = close, "releasing handle after failed create");
                }
                Err(e)
            }
        }
    }
}

fn errno(err: FsError) -> c_int {
    err.errno()
}

/// Timestamps for a `setattr` request, or `None` when neither was supplied.
///
/// An explicit pair is passed through. `Now` becomes `now`; a missing time
/// keeps its current value, fetched through `current` only when needed.
pub fn setattr_times(
    atime: Option<TimeOrNow>,
    mtime: Option<TimeOrNow>,
    now: SystemTime,
    current: impl FnOnce() -> Result<FileAttr, FsError>,
) -> Result<Option<(SystemTime, SystemTime)>, FsError> {
    let resolve = |t: TimeOrNow| match t {
        TimeOrNow::SpecificTime(time) => time,
        TimeOrNow::Now => now,
    };
    match (atime, mtime) {
        (None, None) => Ok(None),
        (Some(a), Some(m)) => Ok(Some((resolve(a), resolve(m)))),
        (Some(a), None) => Ok(Some((resolve(a), current()?.mtime))),
        (None, Some(m)) => Ok(Some((current()?.atime, resolve(m)))),
    }
}

/// Convert a [`FileType`] to its `fuser` counterpart.
pub fn to_fuser_kind(kind: FileType) -> fuser::FileType {
    match kind {
        FileType::RegularFile => fuser::FileType::RegularFile,
        FileType::Directory => fuser::FileType::Directory,
        FileType::Symlink => fuser::FileType::Symlink,
        FileType::BlockDevice => fuser::FileType::BlockDevice,
        FileType::CharDevice => fuser::FileType::CharDevice,
        FileType::NamedPipe => fuser::FileType::NamedPipe,
        FileType::Socket => fuser::FileType::Socket,
    }
}

/// Convert attributes to `fuser`'s shape, reporting them under `ino`.
pub fn to_fuser_attr(ino: u64, attr: &FileAttr) -> fuser::FileAttr {
    fuser::FileAttr {
        ino,
        size: attr.size,
        blocks: attr.blocks,
        atime: attr.atime,
        mtime: attr.mtime,
        ctime: attr.ctime,
        crtime: attr.ctime,
        kind: to_fuser_kind(attr.kind),
        perm: attr.perm(),
        nlink: saturating_u32(attr.nlink),
        uid: attr.uid,
        gid: attr.gid,
        rdev: attr.rdev as u32,
        blksize: saturating_u32(attr.blksize),
        flags: 0,
    }
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

impl<B: FsOps> Filesystem for FuseAdapter<B> {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.do_lookup(parent, name) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, fh: Option<u64>, reply: ReplyAttr) {
        match self.do_getattr(ino, fh) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        match self.do_setattr(ino, mode, uid, gid, size, atime, mtime) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        match self.do_readlink(ino) {
            Ok(target) => reply.data(target.as_os_str().as_bytes()),
            Err(e) => reply.error(e),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        match self.do_mknod(parent, name, mode, rdev) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        match self.do_mkdir(parent, name, mode) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.do_unlink(parent, name) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.do_rmdir(parent, name) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        match self.do_symlink(parent, link_name, target) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        match self.do_rename(parent, name, newparent, newname, flags) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        match self.do_link(ino, newparent, newname) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(e),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.do_open(ino, flags) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.do_read(fh, offset, size) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.do_write(fh, offset, data) {
            Ok(written) => reply.written(written),
            Err(e) => reply.error(e),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        match self.do_flush(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.do_release(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        match self.do_fsync(fh, datasync) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, _ino: u64, _flags: i32, reply: ReplyOpen) {
        reply.opened(0, 0);
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let listing = match self.do_readdir(ino) {
            Ok(listing) => listing,
            Err(e) => {
                reply.error(e);
                return;
            }
        };
        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (entry_ino, kind, name)) in listing.iter().enumerate().skip(skip) {
            if reply.add(*entry_ino, (i + 1) as i64, *kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        match self.do_statfs() {
            Ok(st) => reply.statfs(
                st.blocks,
                st.bfree,
                st.bavail,
                st.files,
                st.ffree,
                saturating_u32(st.bsize),
                saturating_u32(st.namemax),
                saturating_u32(st.frsize),
            ),
            Err(e) => reply.error(e),
        }
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        match self.do_access(ino, mask) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        match self.do_create(parent, name, mode) {
            Ok((attr, fh)) => reply.created(&TTL, &attr, 0, fh, 0),
            Err(e) => reply.error(e),
        }
    }

    fn destroy(&mut self) {
        for (fh, file) in self.files.drain() {
            if let Err(err) = self.fs.release(&file.path, file.handle) {
                warn!(fh, "releasing handle left open at unmount: {err}");
            }
        }
    }
}
