//! # Passthrough Dispatcher
//!
//! The one concrete backend: every verb resolves its virtual path through the
//! [`MountContext`] and performs the same operation on the host.
//!
//! Host failures are never retried or recovered from. They are classified
//! into [`FsError`] with the original errno kept, and returned immediately.
//!
//! ## Example
//!
//! ```rust
//! use passthrough_fs::{FsHandles, MountContext, Passthrough};
//! use std::path::Path;
//!
//! let backing = tempfile::tempdir().unwrap();
//! let fs = Passthrough::new(MountContext::new(backing.path()).unwrap());
//!
//! let path = Path::new("/f");
//! let handle = fs.create(path, 0o644).unwrap();
//! fs.write(path, &handle, b"abc", 0).unwrap();
//! fs.release(path, handle).unwrap();
//!
//! assert_eq!(std::fs::read(backing.path().join("f")).unwrap(), b"abc");
//! ```

use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::IntoRawFd;
use std::os::unix::fs::{DirBuilderExt, DirEntryExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::sys;
use crate::{
    DirEntry, FileAttr, FileType, FsDir, FsError, FsHandles, FsLink, FsPermissions, FsRead,
    FsStats, FsSync, FsWrite, Handle, MountContext, ReadDirIter, StatFs,
};

/// Upper bound on the buffer reserved up front by `read`; longer reads grow it.
const READ_PREALLOC: usize = 128 * 1024;

/// Passthrough dispatcher over a local backing directory.
///
/// Holds nothing but the immutable [`MountContext`], so it is `Send + Sync`
/// and can serve any number of concurrent calls. Open files are represented
/// by [`Handle`]s owned by the caller; the dispatcher keeps no table of them.
#[derive(Debug, Clone)]
pub struct Passthrough {
    ctx: MountContext,
}

impl Passthrough {
    /// Create a dispatcher for the given mount context.
    pub fn new(ctx: MountContext) -> Self {
        Self { ctx }
    }

    /// The mount context this dispatcher resolves against.
    pub fn context(&self) -> &MountContext {
        &self.ctx
    }

    /// Resolve a virtual path to its backing path.
    #[inline]
    pub fn full_path(&self, path: &Path) -> PathBuf {
        self.ctx.resolve(path)
    }
}

impl FsRead for Passthrough {
    fn access(&self, path: &Path, mask: i32) -> Result<(), FsError> {
        sys::access(&self.full_path(path), mask)
            .map_err(|_| FsError::from_errno("access", path, libc::EACCES))
    }

    fn getattr(&self, path: &Path) -> Result<FileAttr, FsError> {
        let meta =
            fs::symlink_metadata(self.full_path(path)).map_err(|e| FsError::from_io("getattr", path, e))?;
        Ok(FileAttr::from(&meta))
    }
}

impl FsDir for Passthrough {
    fn readdir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        let full_path = self.full_path(path);
        let dots = [DirEntry::dot("."), DirEntry::dot("..")].into_iter().map(Ok);

        if !full_path.is_dir() {
            return Ok(ReadDirIter::new(dots));
        }

        let listing = fs::read_dir(&full_path).map_err(|e| FsError::from_io("readdir", path, e))?;
        let virtual_dir = path.to_path_buf();
        let entries = listing.map(move |entry| {
            let entry = entry.map_err(|e| FsError::from_io("readdir", &virtual_dir, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| FsError::from_io("readdir", &virtual_dir, e))?;
            Ok(DirEntry {
                name: entry.file_name(),
                inode: entry.ino(),
                file_type: FileType::from(file_type),
            })
        });
        Ok(ReadDirIter::new(dots.chain(entries)))
    }

    fn mkdir(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        DirBuilder::new()
            .mode(mode)
            .create(self.full_path(path))
            .map_err(|e| FsError::from_io("mkdir", path, e))
    }

    fn rmdir(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_dir(self.full_path(path)).map_err(|e| FsError::from_io("rmdir", path, e))
    }
}

impl FsWrite for Passthrough {
    fn mknod(&self, path: &Path, mode: u32, dev: u64) -> Result<(), FsError> {
        sys::mknod(&self.full_path(path), mode, dev).map_err(|e| FsError::from_io("mknod", path, e))
    }

    fn unlink(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(self.full_path(path)).map_err(|e| FsError::from_io("unlink", path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        fs::rename(self.full_path(from), self.full_path(to))
            .map_err(|e| FsError::from_io("rename", from, e))
    }

    fn truncate(&self, path: &Path, size: u64) -> Result<(), FsError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.full_path(path))
            .map_err(|e| FsError::from_io("truncate", path, e))?;
        file.set_len(size)
            .map_err(|e| FsError::from_io("truncate", path, e))
    }
}

impl FsLink for Passthrough {
    fn symlink(&self, name: &Path, target: &Path) -> Result<(), FsError> {
        std::os::unix::fs::symlink(name, self.full_path(target))
            .map_err(|e| FsError::from_io("symlink", target, e))
    }

    fn link(&self, original: &Path, link: &Path) -> Result<(), FsError> {
        fs::hard_link(self.full_path(original), self.full_path(link))
            .map_err(|e| FsError::from_io("link", link, e))
    }

    fn readlink(&self, path: &Path) -> Result<PathBuf, FsError> {
        let target =
            fs::read_link(self.full_path(path)).map_err(|e| FsError::from_io("readlink", path, e))?;
        if target.is_absolute() {
            if let Some(inside) = self.ctx.to_virtual(&target) {
                return Ok(inside);
            }
        }
        Ok(target)
    }
}

impl FsPermissions for Passthrough {
    fn chmod(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        fs::set_permissions(self.full_path(path), Permissions::from_mode(mode))
            .map_err(|e| FsError::from_io("chmod", path, e))
    }

    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<(), FsError> {
        std::os::unix::fs::chown(self.full_path(path), uid, gid)
            .map_err(|e| FsError::from_io("chown", path, e))
    }

    fn utimens(
        &self,
        path: &Path,
        times: Option<(SystemTime, SystemTime)>,
    ) -> Result<(), FsError> {
        sys::utimens(&self.full_path(path), times).map_err(|e| FsError::from_io("utimens", path, e))
    }
}

impl FsHandles for Passthrough {
    fn open(&self, path: &Path, flags: i32) -> Result<Handle, FsError> {
        let mut options = OpenOptions::new();
        match flags & libc::O_ACCMODE {
            libc::O_WRONLY => options.write(true),
            libc::O_RDWR => options.read(true).write(true),
            _ => options.read(true),
        };
        options.custom_flags(flags & !libc::O_ACCMODE);
        let file = options
            .open(self.full_path(path))
            .map_err(|e| FsError::from_io("open", path, e))?;
        Ok(Handle::new(file))
    }

    fn create(&self, path: &Path, mode: u32) -> Result<Handle, FsError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(mode)
            .open(self.full_path(path))
            .map_err(|e| FsError::from_io("create", path, e))?;
        Ok(Handle::new(file))
    }

    fn read(
        &self,
        path: &Path,
        handle: &Handle,
        size: usize,
        offset: u64,
    ) -> Result<Vec<u8>, FsError> {
        let mut file = handle.file();
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| FsError::from_io("read", path, e))?;
        let mut buf = Vec::with_capacity(size.min(READ_PREALLOC));
        file.take(size as u64)
            .read_to_end(&mut buf)
            .map_err(|e| FsError::from_io("read", path, e))?;
        Ok(buf)
    }

    fn write(
        &self,
        path: &Path,
        handle: &Handle,
        data: &[u8],
        offset: u64,
    ) -> Result<usize, FsError> {
        let mut file = handle.file();
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| FsError::from_io("write", path, e))?;
        file.write(data)
            .map_err(|e| FsError::from_io("write", path, e))
    }

    fn release(&self, path: &Path, handle: Handle) -> Result<(), FsError> {
        let fd = handle.into_file().into_raw_fd();
        sys::close(fd).map_err(|e| FsError::from_io("release", path, e))
    }
}

impl FsSync for Passthrough {
    fn flush(&self, path: &Path, handle: &Handle) -> Result<(), FsError> {
        handle
            .file()
            .sync_all()
            .map_err(|e| FsError::from_io("flush", path, e))
    }

    // The data-only variant is not honored: both requests do a full sync.
    fn fsync(&self, path: &Path, _datasync: bool, handle: &Handle) -> Result<(), FsError> {
        self.flush(path, handle)
    }
}

impl FsStats for Passthrough {
    fn statfs(&self, path: &Path) -> Result<StatFs, FsError> {
        sys::statvfs(&self.full_path(path)).map_err(|e| FsError::from_io("statfs", path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::ffi::OsString;
    use std::os::unix::fs::MetadataExt;

    fn setup() -> (tempfile::TempDir, Passthrough) {
        let dir = tempfile::tempdir().unwrap();
        let fs = Passthrough::new(MountContext::new(dir.path()).unwrap());
        (dir, fs)
    }

    fn p(s: &str) -> &Path {
        Path::new(s)
    }

    #[test]
    fn getattr_matches_lstat() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"hello").unwrap();

        let attr = fs.getattr(p("/f")).unwrap();
        let meta = std::fs::symlink_metadata(dir.path().join("f")).unwrap();
        assert_eq!(attr.size, meta.size());
        assert_eq!(attr.mode, meta.mode());
        assert_eq!(attr.uid, meta.uid());
        assert_eq!(attr.gid, meta.gid());
        assert_eq!(attr.nlink, meta.nlink());
        assert_eq!(attr.ino, meta.ino());
        assert_eq!(attr.mtime, meta.modified().unwrap());
        assert_eq!(attr.atime, meta.accessed().unwrap());
        assert_eq!(attr.kind, FileType::RegularFile);
    }

    #[test]
    fn getattr_does_not_follow_symlinks() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"hello").unwrap();
        std::os::unix::fs::symlink("f", dir.path().join("l")).unwrap();

        let attr = fs.getattr(p("/l")).unwrap();
        assert_eq!(attr.kind, FileType::Symlink);
        assert_eq!(attr.size, 1);
    }

    #[test]
    fn getattr_missing_is_not_found() {
        let (_dir, fs) = setup();
        let err = fs.getattr(p("/does/not/exist")).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
        assert_eq!(err.errno(), libc::ENOENT);
    }

    #[test]
    fn access_missing_is_always_eacces() {
        let (_dir, fs) = setup();
        let err = fs.access(p("/missing"), libc::F_OK).unwrap_err();
        assert!(matches!(err, FsError::PermissionDenied { .. }));
        assert_eq!(err.errno(), libc::EACCES);
    }

    #[test]
    fn access_existing_succeeds() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"").unwrap();
        fs.access(p("/f"), libc::F_OK).unwrap();
        fs.access(p("/f"), libc::R_OK).unwrap();
    }

    #[test]
    fn readdir_starts_with_dots_then_host_entries() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("a"), b"").unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();

        let entries = fs.readdir(p("/")).unwrap().collect_all().unwrap();
        assert_eq!(entries[0].name, OsString::from("."));
        assert_eq!(entries[1].name, OsString::from(".."));

        let listed: HashSet<OsString> = entries[2..].iter().map(|e| e.name.clone()).collect();
        let host: HashSet<OsString> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(listed, host);

        let b = entries.iter().find(|e| e.name == OsString::from("b")).unwrap();
        assert_eq!(b.file_type, FileType::Directory);
    }

    #[test]
    fn readdir_on_file_yields_only_dots() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"").unwrap();
        let names: Vec<_> = fs
            .readdir(p("/f"))
            .unwrap()
            .map(|e| e.unwrap().name)
            .collect();
        assert_eq!(names, vec![OsString::from("."), OsString::from("..")]);
    }

    #[test]
    fn readdir_on_missing_yields_only_dots() {
        let (_dir, fs) = setup();
        assert_eq!(fs.readdir(p("/nope")).unwrap().count(), 2);
    }

    #[test]
    fn mkdir_applies_mode_and_rmdir_removes() {
        let (dir, fs) = setup();
        fs.mkdir(p("/d"), 0o700).unwrap();
        let meta = std::fs::metadata(dir.path().join("d")).unwrap();
        assert!(meta.is_dir());
        assert_eq!(meta.mode() & 0o777, 0o700);

        fs.rmdir(p("/d")).unwrap();
        assert!(!dir.path().join("d").exists());
    }

    #[test]
    fn rmdir_non_empty_fails() {
        let (dir, fs) = setup();
        std::fs::create_dir(dir.path().join("d")).unwrap();
        std::fs::write(dir.path().join("d/f"), b"").unwrap();
        let err = fs.rmdir(p("/d")).unwrap_err();
        assert!(matches!(err, FsError::DirectoryNotEmpty { .. }));
    }

    #[test]
    fn mkdir_existing_fails() {
        let (dir, fs) = setup();
        std::fs::create_dir(dir.path().join("d")).unwrap();
        let err = fs.mkdir(p("/d"), 0o755).unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn mknod_creates_fifo() {
        let (dir, fs) = setup();
        fs.mknod(p("/pipe"), libc::S_IFIFO as u32 | 0o644, 0).unwrap();
        let attr = fs.getattr(p("/pipe")).unwrap();
        assert_eq!(attr.kind, FileType::NamedPipe);
        assert!(dir.path().join("pipe").exists());
    }

    #[test]
    fn unlink_removes_file() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"").unwrap();
        fs.unlink(p("/f")).unwrap();
        assert!(!dir.path().join("f").exists());
        assert!(matches!(
            fs.unlink(p("/f")).unwrap_err(),
            FsError::NotFound { .. }
        ));
    }

    #[test]
    fn rename_moves_entry() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("a"), b"content").unwrap();
        fs.rename(p("/a"), p("/b")).unwrap();
        assert!(matches!(
            fs.getattr(p("/a")).unwrap_err(),
            FsError::NotFound { .. }
        ));
        assert_eq!(std::fs::read(dir.path().join("b")).unwrap(), b"content");
    }

    #[test]
    fn truncate_by_path() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"abcdef").unwrap();
        fs.truncate(p("/f"), 2).unwrap();
        assert_eq!(std::fs::read(dir.path().join("f")).unwrap(), b"ab");
        fs.truncate(p("/f"), 4).unwrap();
        assert_eq!(std::fs::read(dir.path().join("f")).unwrap(), b"ab\0\0");
    }

    #[test]
    fn truncate_missing_is_not_found() {
        let (_dir, fs) = setup();
        assert!(matches!(
            fs.truncate(p("/nope"), 0).unwrap_err(),
            FsError::NotFound { .. }
        ));
    }

    #[test]
    fn readlink_rewrites_targets_inside_root() {
        let (dir, fs) = setup();
        let root = fs.context().root().to_path_buf();
        fs.symlink(&root.join("x"), p("/abs")).unwrap();
        fs.symlink(p("x"), p("/rel")).unwrap();

        assert_eq!(fs.readlink(p("/abs")).unwrap(), PathBuf::from("/x"));
        assert_eq!(fs.readlink(p("/rel")).unwrap(), PathBuf::from("x"));
        assert_eq!(
            std::fs::read_link(dir.path().join("abs")).unwrap(),
            root.join("x")
        );
    }

    #[test]
    fn readlink_keeps_absolute_targets_outside_root() {
        let (_dir, fs) = setup();
        fs.symlink(p("/definitely/elsewhere"), p("/out")).unwrap();
        assert_eq!(
            fs.readlink(p("/out")).unwrap(),
            PathBuf::from("/definitely/elsewhere")
        );
    }

    #[test]
    fn readlink_on_regular_file_is_einval() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"").unwrap();
        let err = fs.readlink(p("/f")).unwrap_err();
        assert_eq!(err.errno(), libc::EINVAL);
    }

    #[test]
    fn hard_link_shares_inode() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("a"), b"x").unwrap();
        fs.link(p("/a"), p("/b")).unwrap();
        let a = fs.getattr(p("/a")).unwrap();
        let b = fs.getattr(p("/b")).unwrap();
        assert_eq!(a.ino, b.ino);
        assert_eq!(a.nlink, 2);
    }

    #[test]
    fn chmod_sets_mode() {
        let (_dir, fs) = setup();
        let h = fs.create(p("/f"), 0o644).unwrap();
        fs.release(p("/f"), h).unwrap();
        fs.chmod(p("/f"), 0o600).unwrap();
        assert_eq!(fs.getattr(p("/f")).unwrap().perm(), 0o600);
    }

    #[test]
    fn chown_to_self_succeeds() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"").unwrap();
        let attr = fs.getattr(p("/f")).unwrap();
        fs.chown(p("/f"), Some(attr.uid), Some(attr.gid)).unwrap();
        fs.chown(p("/f"), None, None).unwrap();
    }

    #[test]
    fn utimens_explicit_and_now() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"").unwrap();
        let old = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(86_400);
        fs.utimens(p("/f"), Some((old, old))).unwrap();
        assert_eq!(fs.getattr(p("/f")).unwrap().mtime, old);

        fs.utimens(p("/f"), None).unwrap();
        assert!(fs.getattr(p("/f")).unwrap().mtime > old);
    }

    #[test]
    fn create_write_read_round_trip() {
        let (_dir, fs) = setup();
        let h = fs.create(p("/f"), 0o644).unwrap();
        assert_eq!(fs.write(p("/f"), &h, b"abc", 0).unwrap(), 3);
        fs.release(p("/f"), h).unwrap();

        let h = fs.open(p("/f"), libc::O_RDONLY).unwrap();
        assert_eq!(fs.read(p("/f"), &h, 3, 0).unwrap(), b"abc");
        fs.release(p("/f"), h).unwrap();
    }

    #[test]
    fn create_is_write_only() {
        let (_dir, fs) = setup();
        let h = fs.create(p("/f"), 0o644).unwrap();
        assert!(fs.read(p("/f"), &h, 1, 0).is_err());
        fs.release(p("/f"), h).unwrap();
    }

    #[test]
    fn create_does_not_truncate_existing() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"keep").unwrap();
        let h = fs.create(p("/f"), 0o644).unwrap();
        fs.release(p("/f"), h).unwrap();
        assert_eq!(std::fs::read(dir.path().join("f")).unwrap(), b"keep");
    }

    #[test]
    fn read_and_write_honor_offsets() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"0123456789").unwrap();
        let h = fs.open(p("/f"), libc::O_RDWR).unwrap();
        assert_eq!(fs.read(p("/f"), &h, 3, 4).unwrap(), b"456");
        fs.write(p("/f"), &h, b"xy", 8).unwrap();
        assert_eq!(fs.read(p("/f"), &h, 100, 6).unwrap(), b"67xy");
        assert!(fs.read(p("/f"), &h, 10, 50).unwrap().is_empty());
        fs.release(p("/f"), h).unwrap();
    }

    #[test]
    fn read_length_larger_than_file_is_clamped() {
        let (dir, fs) = setup();
        std::fs::write(dir.path().join("f"), b"abc").unwrap();
        let h = fs.open(p("/f"), libc::O_RDONLY).unwrap();
        assert_eq!(fs.read(p("/f"), &h, usize::MAX, 0).unwrap(), b"abc");
        assert_eq!(fs.read(p("/f"), &h, usize::MAX, 1).unwrap(), b"bc");
        fs.release(p("/f"), h).unwrap();
    }

    #[test]
    fn read_longer_than_prealloc() {
        let (dir, fs) = setup();
        let data = vec![7u8; READ_PREALLOC * 2 + 5];
        std::fs::write(dir.path().join("big"), &data).unwrap();
        let h = fs.open(p("/big"), libc::O_RDONLY).unwrap();
        assert_eq!(fs.read(p("/big"), &h, data.len(), 0).unwrap(), data);
        fs.release(p("/big"), h).unwrap();
    }

    #[test]
    fn release_reports_close_failure() {
        use std::os::fd::{FromRawFd, RawFd};

        let (_dir, fs) = setup();
        // SAFETY: the descriptor is never allocated by the process, so
        // closing it touches nothing but fails with EBADF.
        let file = unsafe { std::fs::File::from_raw_fd(RawFd::MAX) };
        let err = fs.release(p("/f"), Handle::new(file)).unwrap_err();
        assert!(matches!(err, FsError::Io { .. }));
        assert_eq!(err.errno(), libc::EBADF);
        assert_eq!(err.operation(), "release");
    }

    #[test]
    fn open_missing_is_not_found() {
        let (_dir, fs) = setup();
        assert!(matches!(
            fs.open(p("/nope"), libc::O_RDONLY).unwrap_err(),
            FsError::NotFound { .. }
        ));
    }

    #[test]
    fn open_passes_creation_flags() {
        let (dir, fs) = setup();
        let h = fs
            .open(p("/new"), libc::O_WRONLY | libc::O_CREAT | libc::O_EXCL)
            .unwrap();
        fs.release(p("/new"), h).unwrap();
        assert!(dir.path().join("new").exists());

        let err = fs
            .open(p("/new"), libc::O_WRONLY | libc::O_CREAT | libc::O_EXCL)
            .unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn flush_and_fsync_succeed_on_open_handle() {
        let (_dir, fs) = setup();
        let h = fs.create(p("/f"), 0o644).unwrap();
        fs.write(p("/f"), &h, b"data", 0).unwrap();
        fs.flush(p("/f"), &h).unwrap();
        fs.fsync(p("/f"), true, &h).unwrap();
        fs.fsync(p("/f"), false, &h).unwrap();
        fs.release(p("/f"), h).unwrap();
    }

    #[test]
    fn statfs_matches_host() {
        let (dir, fs) = setup();
        let ours = fs.statfs(p("/")).unwrap();
        let host = sys::statvfs(dir.path()).unwrap();
        assert_eq!(ours.bsize, host.bsize);
        assert_eq!(ours.blocks, host.blocks);
        assert_eq!(ours.namemax, host.namemax);
    }

    #[test]
    fn passthrough_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Passthrough>();
    }
}
