//! Core types shared by the dispatcher and its transports.

use std::ffi::OsString;
use std::fs::File;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The root directory always has inode 1 (FUSE convention).
pub const ROOT_INODE: u64 = 1;

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    RegularFile,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Block device.
    BlockDevice,
    /// Character device.
    CharDevice,
    /// Named pipe.
    NamedPipe,
    /// Unix domain socket.
    Socket,
}

impl From<std::fs::FileType> for FileType {
    fn from(ft: std::fs::FileType) -> Self {
        if ft.is_dir() {
            FileType::Directory
        } else if ft.is_symlink() {
            FileType::Symlink
        } else if ft.is_block_device() {
            FileType::BlockDevice
        } else if ft.is_char_device() {
            FileType::CharDevice
        } else if ft.is_fifo() {
            FileType::NamedPipe
        } else if ft.is_socket() {
            FileType::Socket
        } else {
            FileType::RegularFile
        }
    }
}

/// Attributes returned by `getattr`.
///
/// Taken from `lstat` on the resolved path: a symlink reports its own
/// attributes, not its target's.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileAttr {
    /// Host inode number.
    pub ino: u64,
    /// Entry type, derived from `mode`.
    pub kind: FileType,
    /// Full mode bits, including the file type bits.
    pub mode: u32,
    /// Number of hard links.
    pub nlink: u64,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Device id for special files.
    pub rdev: u64,
    /// Size in bytes.
    pub size: u64,
    /// Allocated 512-byte blocks.
    pub blocks: u64,
    /// Preferred I/O block size.
    pub blksize: u64,
    /// Last access time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub atime: SystemTime,
    /// Last modification time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub mtime: SystemTime,
    /// Last status change time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub ctime: SystemTime,
}

impl FileAttr {
    /// Permission bits only (`mode & 0o7777`).
    #[inline]
    pub fn perm(&self) -> u16 {
        (self.mode & 0o7777) as u16
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == FileType::Directory
    }
}

impl From<&std::fs::Metadata> for FileAttr {
    fn from(meta: &std::fs::Metadata) -> Self {
        Self {
            ino: meta.ino(),
            kind: FileType::from(meta.file_type()),
            mode: meta.mode(),
            nlink: meta.nlink(),
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev(),
            size: meta.size(),
            blocks: meta.blocks(),
            blksize: meta.blksize(),
            atime: unix_time(meta.atime(), meta.atime_nsec()),
            mtime: unix_time(meta.mtime(), meta.mtime_nsec()),
            ctime: unix_time(meta.ctime(), meta.ctime_nsec()),
        }
    }
}

/// Convert a `(seconds, nanoseconds)` pair from `stat` into a [`SystemTime`].
///
/// Negative seconds are times before the epoch; `nsec` is always the
/// non-negative remainder, as `stat` reports it.
pub fn unix_time(sec: i64, nsec: i64) -> SystemTime {
    let nanos = Duration::from_nanos(nsec.clamp(0, 999_999_999) as u64);
    if sec >= 0 {
        UNIX_EPOCH + Duration::from_secs(sec as u64) + nanos
    } else {
        UNIX_EPOCH - Duration::from_secs(sec.unsigned_abs()) + nanos
    }
}

/// Filesystem statistics, field for field from `statvfs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatFs {
    /// Free blocks available to unprivileged users.
    pub bavail: u64,
    /// Free blocks.
    pub bfree: u64,
    /// Total blocks, in units of `frsize`.
    pub blocks: u64,
    /// Filesystem block size.
    pub bsize: u64,
    /// Free inodes available to unprivileged users.
    pub favail: u64,
    /// Free inodes.
    pub ffree: u64,
    /// Total inodes.
    pub files: u64,
    /// Mount flags.
    pub flag: u64,
    /// Fragment size.
    pub frsize: u64,
    /// Maximum filename length.
    pub namemax: u64,
}

/// A single item of a `readdir` stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (no path components).
    pub name: OsString,
    /// Host inode number; 0 for the synthesized `.` and `..` entries.
    pub inode: u64,
    /// Entry type as reported by the directory listing.
    pub file_type: FileType,
}

impl DirEntry {
    /// The synthesized `.` or `..` entry.
    pub(crate) fn dot(name: &str) -> Self {
        Self {
            name: OsString::from(name),
            inode: 0,
            file_type: FileType::Directory,
        }
    }
}

/// An open host file, returned by `open` and `create`.
///
/// The handle owns the descriptor. Releasing it through the dispatcher
/// consumes the value, so a released handle cannot be presented again.
/// Dropping a handle without releasing it still closes the descriptor,
/// but any close error is lost.
#[derive(Debug)]
pub struct Handle {
    file: File,
}

impl Handle {
    /// Wrap an open file.
    pub fn new(file: File) -> Self {
        Self { file }
    }

    /// The underlying file.
    #[inline]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Give up the wrapper and take the file.
    pub fn into_file(self) -> File {
        self.file
    }
}

/// Serde support for SystemTime (when serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_time_positive() {
        let t = unix_time(10, 500);
        assert_eq!(
            t.duration_since(UNIX_EPOCH).unwrap(),
            Duration::new(10, 500)
        );
    }

    #[test]
    fn unix_time_before_epoch() {
        let t = unix_time(-2, 250_000_000);
        let before = UNIX_EPOCH.duration_since(t).unwrap();
        assert_eq!(before, Duration::from_millis(1750));
    }

    #[test]
    fn file_type_from_std() {
        let dir = tempfile::tempdir().unwrap();
        let meta = std::fs::symlink_metadata(dir.path()).unwrap();
        assert_eq!(FileType::from(meta.file_type()), FileType::Directory);

        let file = dir.path().join("f");
        std::fs::write(&file, b"x").unwrap();
        let meta = std::fs::symlink_metadata(&file).unwrap();
        assert_eq!(FileType::from(meta.file_type()), FileType::RegularFile);

        let link = dir.path().join("l");
        std::os::unix::fs::symlink("f", &link).unwrap();
        let meta = std::fs::symlink_metadata(&link).unwrap();
        assert_eq!(FileType::from(meta.file_type()), FileType::Symlink);
    }

    #[test]
    fn attr_perm_masks_type_bits() {
        let dir = tempfile::tempdir().unwrap();
        let meta = std::fs::symlink_metadata(dir.path()).unwrap();
        let attr = FileAttr::from(&meta);
        assert!(attr.is_dir());
        assert_eq!(u32::from(attr.perm()), meta.mode() & 0o7777);
    }

    #[test]
    fn dot_entries_are_directories() {
        let dot = DirEntry::dot(".");
        assert_eq!(dot.name, OsString::from("."));
        assert_eq!(dot.file_type, FileType::Directory);
        assert_eq!(dot.inode, 0);
    }

    #[test]
    fn root_inode_is_one() {
        assert_eq!(ROOT_INODE, 1);
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileType>();
        assert_send_sync::<FileAttr>();
        assert_send_sync::<StatFs>();
        assert_send_sync::<DirEntry>();
        assert_send_sync::<Handle>();
    }

    #[cfg(feature = "serde")]
    #[test]
    fn attr_serializes_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let meta = std::fs::symlink_metadata(dir.path()).unwrap();
        let attr = FileAttr::from(&meta);
        let json = serde_json::to_string(&attr).unwrap();
        let back: FileAttr = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, FileType::Directory);
        assert_eq!(back.mode, attr.mode);
    }
}
