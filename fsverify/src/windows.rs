//! Windows file-identity primitives: `GetFileInformationByHandle` for the
//! platform-native stand-in for device+inode, and drive-type inspection for
//! network-filesystem detection.
//!
//! Windows has no safe, exposed `openat`-relative-create primitive, so
//! [`create_file_in_verified_parent`](crate::create_file_in_verified_parent)
//! re-verifies the parent's identity immediately before `CreateFileW` rather
//! than creating strictly relative to an open parent descriptor — a
//! narrower guarantee than the Unix path, recorded in `DESIGN.md`.

use std::ffi::OsStr;
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, GetDriveTypeW, GetFileInformationByHandle, BY_HANDLE_FILE_INFORMATION,
    CREATE_NEW, DRIVE_REMOTE, FILE_ATTRIBUTE_NORMAL, FILE_FLAG_BACKUP_SEMANTICS,
    FILE_FLAG_OPEN_REPARSE_POINT, FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE,
    GENERIC_READ, GENERIC_WRITE, OPEN_EXISTING,
};

use warden_types::FileIdentity;

pub struct OwnedHandle(HANDLE);

impl OwnedHandle {
    #[must_use]
    pub fn raw(&self) -> HANDLE {
        self.0
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

fn wide(path: &Path) -> Vec<u16> {
    OsStr::new(path)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// Open `path` without following a reparse point (the Windows analogue of
/// `O_NOFOLLOW`).
pub fn open_nofollow(path: &Path) -> io::Result<OwnedHandle> {
    let wide_path = wide(path);
    let handle = unsafe {
        CreateFileW(
            wide_path.as_ptr(),
            GENERIC_READ,
            FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
            std::ptr::null(),
            OPEN_EXISTING,
            FILE_FLAG_BACKUP_SEMANTICS | FILE_FLAG_OPEN_REPARSE_POINT,
            0,
        )
    };
    if handle == INVALID_HANDLE_VALUE {
        return Err(io::Error::last_os_error());
    }
    Ok(OwnedHandle(handle))
}

/// Create `path` with `CREATE_NEW` semantics (fails if it already exists).
/// Caller re-verifies the parent's identity immediately beforehand.
pub fn create_new_file(path: &Path) -> io::Result<OwnedHandle> {
    let wide_path = wide(path);
    let handle = unsafe {
        CreateFileW(
            wide_path.as_ptr(),
            GENERIC_READ | GENERIC_WRITE,
            FILE_SHARE_READ,
            std::ptr::null(),
            CREATE_NEW,
            FILE_ATTRIBUTE_NORMAL | FILE_FLAG_OPEN_REPARSE_POINT,
            0,
        )
    };
    if handle == INVALID_HANDLE_VALUE {
        return Err(io::Error::last_os_error());
    }
    Ok(OwnedHandle(handle))
}

pub fn identity_of_handle(handle: &OwnedHandle) -> io::Result<FileIdentity> {
    let mut info: BY_HANDLE_FILE_INFORMATION = unsafe { std::mem::zeroed() };
    let ok = unsafe { GetFileInformationByHandle(handle.raw(), &mut info) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    let inode = (u64::from(info.nFileIndexHigh) << 32) | u64::from(info.nFileIndexLow);
    Ok(FileIdentity {
        device: u64::from(info.dwVolumeSerialNumber),
        inode,
    })
}

/// True if `path`'s drive is a remote (network) drive.
#[must_use]
pub fn is_network_drive(path: &Path) -> bool {
    let Some(root) = path.ancestors().last() else {
        return false;
    };
    let wide_root = wide(root);
    unsafe { GetDriveTypeW(wide_root.as_ptr()) == DRIVE_REMOTE }
}
