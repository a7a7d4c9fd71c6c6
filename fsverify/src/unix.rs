//! Unix raw syscall primitives: `openat`-family opens with
//! `O_NOFOLLOW`/`O_DIRECTORY`/`O_EXCL`, and `fstat` identity reads.
//!
//! Mirrors the libc-based raw syscall idiom the rest of this workspace uses
//! for process and file-descriptor management rather than going through
//! `std::fs` where `std::fs` can't express the required flags.

use std::ffi::CString;
use std::fs::{File, Metadata};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::path::Path;

use warden_types::FileIdentity;

#[must_use]
pub fn identity_of_metadata(meta: &Metadata) -> FileIdentity {
    FileIdentity {
        device: meta.dev(),
        inode: meta.ino(),
    }
}

fn path_to_cstring(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

/// Open `path` for reading without following a trailing symlink. Returns
/// `ELOOP` (surfaced as a normal `io::Error`) if `path` is itself a symlink.
pub fn open_nofollow(path: &Path) -> io::Result<File> {
    let cpath = path_to_cstring(path)?;
    let fd = unsafe {
        libc::open(
            cpath.as_ptr(),
            libc::O_RDONLY | libc::O_NOFOLLOW | libc::O_CLOEXEC,
        )
    };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { File::from_raw_fd(fd) })
}

/// Open `path` as a directory without following a trailing symlink.
pub fn open_dir_nofollow(path: &Path) -> io::Result<File> {
    let cpath = path_to_cstring(path)?;
    let fd = unsafe {
        libc::open(
            cpath.as_ptr(),
            libc::O_RDONLY | libc::O_DIRECTORY | libc::O_NOFOLLOW | libc::O_CLOEXEC,
        )
    };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { File::from_raw_fd(fd) })
}

/// Create `name` inside the directory identified by `parent`, relative to
/// its descriptor, with exclusive-create and symlink-nofollow semantics.
/// This is the step that closes the parent-identity-check-to-child-creation
/// race (spec §4.3).
pub fn openat_create_excl(parent: &File, name: &str) -> io::Result<File> {
    let cname = CString::new(name).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let fd = unsafe {
        libc::openat(
            parent.as_raw_fd(),
            cname.as_ptr(),
            libc::O_WRONLY | libc::O_CREAT | libc::O_EXCL | libc::O_NOFOLLOW | libc::O_CLOEXEC,
            0o644,
        )
    };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { File::from_raw_fd(fd) })
}

pub fn fstat_identity(file: &File) -> io::Result<FileIdentity> {
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::fstat(file.as_raw_fd(), &mut st) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(FileIdentity {
        device: st.st_dev as u64,
        inode: st.st_ino as u64,
    })
}

#[must_use]
pub fn is_symlink_error(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ELOOP)
}

#[must_use]
pub fn is_already_exists_error(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EEXIST)
}
