//! Mount configuration shared by the binary and embedders.

use std::fs;
use std::io;
use std::path::Path;

/// Filesystem name used when none is given.
pub const DEFAULT_FSNAME: &str = "passthrough";

/// Options applied when mounting the passthrough filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MountOptions {
    /// Name shown in the mount table.
    pub fsname: String,
    /// Let users other than the mounting user access the mount.
    pub allow_other: bool,
    /// Unmount when the mounting process exits.
    pub auto_unmount: bool,
    /// Mount read-only.
    pub read_only: bool,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            fsname: DEFAULT_FSNAME.to_string(),
            allow_other: false,
            auto_unmount: false,
            read_only: false,
        }
    }
}

impl MountOptions {
    /// The equivalent `fuser` mount options.
    #[cfg(feature = "fuse")]
    pub fn to_fuser(&self) -> Vec<fuser::MountOption> {
        let mut options = vec![fuser::MountOption::FSName(self.fsname.clone())];
        if self.allow_other {
            options.push(fuser::MountOption::AllowOther);
        }
        if self.auto_unmount {
            options.push(fuser::MountOption::AutoUnmount);
        }
        if self.read_only {
            options.push(fuser::MountOption::RO);
        }
        options
    }
}

/// Make sure `mount_point` exists as a directory.
///
/// With `clean`, any existing tree at `mount_point` is removed first, so the
/// mount starts over an empty directory.
///
/// # Errors
///
/// Propagates any failure to remove or create the directory.
pub fn prepare_mount_point(mount_point: &Path, clean: bool) -> io::Result<()> {
    if clean && mount_point.exists() {
        fs::remove_dir_all(mount_point)?;
    }
    fs::create_dir_all(mount_point)
}
