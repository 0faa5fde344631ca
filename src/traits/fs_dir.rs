//! Directory operations.

use std::path::Path;

use crate::{DirEntry, FsError};

/// Directory operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsDir`.
pub trait FsDir: Send + Sync {
    /// List a directory.
    ///
    /// The stream always begins with `.` and `..`. Real entries follow, in
    /// host order, only if `path` resolves to a directory; for anything else
    /// the stream holds just the two synthesized entries.
    ///
    /// # Errors
    ///
    /// - [`FsError::PermissionDenied`] if the directory exists but cannot be
    ///   opened for listing
    fn readdir(&self, path: &Path) -> Result<ReadDirIter, FsError>;

    /// Create a directory with permission bits `mode`.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if the path already exists
    /// - [`FsError::NotFound`] if the parent does not exist
    fn mkdir(&self, path: &Path, mode: u32) -> Result<(), FsError>;

    /// Remove an empty directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is not a directory
    /// - [`FsError::DirectoryNotEmpty`] if the directory is not empty
    fn rmdir(&self, path: &Path) -> Result<(), FsError>;
}

/// Lazy stream of directory entries.
///
/// Produced once per `readdir` call and consumed once; it cannot be
/// rewound. Host entries are read as the stream is advanced, so an error on
/// one entry shows up as an `Err` item.
///
/// # Example
///
/// ```rust
/// use passthrough_fs::{FsDir, FsError};
/// use std::path::Path;
///
/// fn names<B: FsDir>(backend: &B) -> Result<Vec<String>, FsError> {
///     let mut names = Vec::new();
///     for entry in backend.readdir(Path::new("/"))? {
///         names.push(entry?.name.to_string_lossy().into_owned());
///     }
///     Ok(names)
/// }
/// ```
pub struct ReadDirIter(Box<dyn Iterator<Item = Result<DirEntry, FsError>> + Send + 'static>);

impl ReadDirIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<DirEntry, FsError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected vector.
    pub fn from_vec(entries: Vec<Result<DirEntry, FsError>>) -> Self {
        Self(Box::new(entries.into_iter()))
    }

    /// Collect all entries, short-circuiting on first error.
    pub fn collect_all(self) -> Result<Vec<DirEntry>, FsError> {
        self.collect()
    }
}

impl Iterator for ReadDirIter {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl std::fmt::Debug for ReadDirIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadDirIter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileType;
    use std::ffi::OsString;

    fn entry(name: &str) -> DirEntry {
        DirEntry {
            name: OsString::from(name),
            inode: 7,
            file_type: FileType::RegularFile,
        }
    }

    #[test]
    fn read_dir_iter_from_vec() {
        let iter = ReadDirIter::from_vec(vec![Ok(entry("a")), Ok(entry("b"))]);
        let collected: Vec<_> = iter.collect();
        assert_eq!(collected.len(), 2);
    }

    #[test]
    fn read_dir_iter_collect_all_success() {
        let entries = ReadDirIter::from_vec(vec![Ok(entry("a"))])
            .collect_all()
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, OsString::from("a"));
    }

    #[test]
    fn read_dir_iter_collect_all_error() {
        let entries = vec![
            Ok(entry("a")),
            Err(FsError::from_errno("readdir", "/b", libc::EACCES)),
        ];
        let result = ReadDirIter::from_vec(entries).collect_all();
        assert!(matches!(result, Err(FsError::PermissionDenied { .. })));
    }

    #[test]
    fn read_dir_iter_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ReadDirIter>();
    }
}
