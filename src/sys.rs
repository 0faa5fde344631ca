//! Host primitives that `std` does not expose, as thin `libc` wrappers.
//!
//! Each wrapper converts the path to a `CString` for the duration of the call
//! and returns the raw errno as an [`io::Error`] on failure.

use std::ffi::CString;
use std::io;
use std::mem::MaybeUninit;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::StatFs;

fn cstring(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))
}

fn check(result: libc::c_int) -> io::Result<()> {
    if result < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// `access(2)` with the caller's real uid/gid.
pub(crate) fn access(path: &Path, mask: i32) -> io::Result<()> {
    let c_path = cstring(path)?;
    // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
    check(unsafe { libc::access(c_path.as_ptr(), mask) })
}

/// `mknod(2)`.
pub(crate) fn mknod(path: &Path, mode: u32, dev: u64) -> io::Result<()> {
    let c_path = cstring(path)?;
    // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
    check(unsafe { libc::mknod(c_path.as_ptr(), mode as libc::mode_t, dev as libc::dev_t) })
}

/// `statvfs(3)`.
pub(crate) fn statvfs(path: &Path) -> io::Result<StatFs> {
    let c_path = cstring(path)?;
    let mut st = MaybeUninit::<libc::statvfs>::uninit();
    // SAFETY: c_path is valid for the call and st points to writable memory
    // large enough for a statvfs struct.
    check(unsafe { libc::statvfs(c_path.as_ptr(), st.as_mut_ptr()) })?;
    // SAFETY: statvfs returned success, so the struct is initialized.
    let st = unsafe { st.assume_init() };

    Ok(StatFs {
        bavail: u64::from(st.f_bavail),
        bfree: u64::from(st.f_bfree),
        blocks: u64::from(st.f_blocks),
        bsize: u64::from(st.f_bsize),
        favail: u64::from(st.f_favail),
        ffree: u64::from(st.f_ffree),
        files: u64::from(st.f_files),
        flag: u64::from(st.f_flag),
        frsize: u64::from(st.f_frsize),
        namemax: u64::from(st.f_namemax),
    })
}

fn timespec(time: SystemTime) -> libc::timespec {
    let (sec, nsec) = match time.duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_secs() as i64, i64::from(d.subsec_nanos())),
        Err(e) => {
            let d = e.duration();
            let sec = -(d.as_secs() as i64);
            match d.subsec_nanos() {
                0 => (sec, 0),
                n => (sec - 1, 1_000_000_000 - i64::from(n)),
            }
        }
    };
    // SAFETY: timespec is a plain C struct; all-zero is a valid value and
    // the platform may add private padding fields.
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    ts.tv_sec = sec as libc::time_t;
    ts.tv_nsec = nsec as _;
    ts
}

/// `utimensat(2)` relative to the working directory, following symlinks.
///
/// `None` sets both timestamps to the current time.
pub(crate) fn utimens(path: &Path, times: Option<(SystemTime, SystemTime)>) -> io::Result<()> {
    let c_path = cstring(path)?;
    let spec = times.map(|(atime, mtime)| [timespec(atime), timespec(mtime)]);
    let spec_ptr = spec.as_ref().map_or(ptr::null(), |s| s.as_ptr());
    // SAFETY: c_path is valid for the call; spec_ptr is either null or points
    // to two timespec values that outlive the call.
    check(unsafe { libc::utimensat(libc::AT_FDCWD, c_path.as_ptr(), spec_ptr, 0) })
}

/// `close(2)`, reporting the error that dropping a `File` would swallow.
pub(crate) fn close(fd: RawFd) -> io::Result<()> {
    // SAFETY: the caller transfers ownership of fd; it is not used again.
    check(unsafe { libc::close(fd) })
}
