//! Inode number to virtual path mapping for inode-addressed transports.
//!
//! The dispatcher speaks paths; FUSE speaks inode numbers. [`InodeTable`]
//! hands out sequential numbers as paths are looked up and keeps both
//! directions in sync across renames and removals. Inode 1 is always `/`.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::ROOT_INODE;

/// Bidirectional inode/path map with kernel lookup counts.
///
/// Every [`lookup_or_insert`](Self::lookup_or_insert) is one reference held
/// by the kernel. [`forget`](Self::forget) gives references back, and an
/// inode whose count drops to zero is dropped, so the table only holds what
/// the kernel still caches. The root is permanent.
#[derive(Debug)]
pub struct InodeTable {
    paths: HashMap<u64, PathBuf>,
    inodes: HashMap<PathBuf, u64>,
    lookups: HashMap<u64, u64>,
    next: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// A table containing only the root.
    pub fn new() -> Self {
        let root = PathBuf::from("/");
        let mut paths = HashMap::new();
        let mut inodes = HashMap::new();
        paths.insert(ROOT_INODE, root.clone());
        inodes.insert(root, ROOT_INODE);
        Self {
            paths,
            inodes,
            lookups: HashMap::new(),
            next: ROOT_INODE + 1,
        }
    }

    /// Virtual path of `ino`, if known.
    pub fn path(&self, ino: u64) -> Option<&Path> {
        self.paths.get(&ino).map(PathBuf::as_path)
    }

    /// Virtual path of `name` inside directory `parent`, if `parent` is known.
    pub fn child_path(&self, parent: u64, name: &OsStr) -> Option<PathBuf> {
        self.path(parent).map(|dir| dir.join(name))
    }

    /// Inode of `path`, if one has been assigned.
    pub fn inode(&self, path: &Path) -> Option<u64> {
        self.inodes.get(path).copied()
    }

    /// Inode of `path`, assigning the next free number on first sight, and
    /// count one kernel reference to it.
    pub fn lookup_or_insert(&mut self, path: &Path) -> u64 {
        let ino = match self.inodes.get(path) {
            Some(ino) => *ino,
            None => {
                let ino = self.next;
                self.next += 1;
                self.paths.insert(ino, path.to_path_buf());
                self.inodes.insert(path.to_path_buf(), ino);
                ino
            }
        };
        if ino != ROOT_INODE {
            *self.lookups.entry(ino).or_insert(0) += 1;
        }
        ino
    }

    /// Give back `nlookup` kernel references to `ino`.
    ///
    /// Unknown inodes are ignored: they may already have been removed by
    /// `unlink` or `rename` while the kernel still held them.
    pub fn forget(&mut self, ino: u64, nlookup: u64) {
        if ino == ROOT_INODE {
            return;
        }
        let Some(count) = self.lookups.get_mut(&ino) else {
            return;
        };
        *count = count.saturating_sub(nlookup);
        if *count == 0 {
            self.lookups.remove(&ino);
            if let Some(path) = self.paths.remove(&ino) {
                self.inodes.remove(&path);
            }
        }
    }

    /// Move `from` and everything below it to `to`.
    ///
    /// Any inode previously assigned to `to` (or below it) is dropped, since
    /// the host rename replaced that entry.
    pub fn rename(&mut self, from: &Path, to: &Path) {
        self.remove(to);

        let moved: Vec<(PathBuf, u64)> = self
            .inodes
            .iter()
            .filter(|(path, _)| path.starts_with(from))
            .map(|(path, ino)| (path.clone(), *ino))
            .collect();

        for (old, ino) in moved {
            let new = match old.strip_prefix(from) {
                Ok(rest) if rest.as_os_str().is_empty() => to.to_path_buf(),
                Ok(rest) => to.join(rest),
                Err(_) => continue,
            };
            self.inodes.remove(&old);
            self.inodes.insert(new.clone(), ino);
            self.paths.insert(ino, new);
        }
    }

    /// Drop `path` and everything below it. The root is never removed.
    pub fn remove(&mut self, path: &Path) {
        if path == Path::new("/") {
            return;
        }
        let gone: Vec<PathBuf> = self
            .inodes
            .keys()
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();
        for p in gone {
            if let Some(ino) = self.inodes.remove(&p) {
                self.paths.remove(&ino);
                self.lookups.remove(&ino);
            }
        }
    }

    /// Number of mapped inodes, root included.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always `false`: the root is permanent.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
