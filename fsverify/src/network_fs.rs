//! Network-filesystem advisory detection (spec §4.3).
//!
//! A network filesystem doesn't invalidate a capture, but callers may want
//! to downgrade trust (e.g. treat approvals as shorter-lived) when the
//! target lives on one.

use std::path::Path;

const NETWORK_FS_TYPES: &[&str] = &[
    "nfs",
    "nfs4",
    "cifs",
    "smbfs",
    "smb3",
    "afs",
    "fuse.sshfs",
    "fuse.rclone",
];

#[cfg(target_os = "linux")]
#[must_use]
pub fn is_network_fs(path: &Path) -> bool {
    let Ok(resolved) = std::fs::canonicalize(path) else {
        return false;
    };
    let Ok(mounts) = std::fs::read_to_string("/proc/mounts") else {
        return false;
    };

    // /proc/mounts lines: "<device> <mountpoint> <fstype> <options> 0 0".
    // Pick the longest mountpoint prefix match, mirroring how the kernel
    // resolves which mount governs a given path.
    let mut best: Option<(&str, &str)> = None;
    for line in mounts.lines() {
        let mut fields = line.split_whitespace();
        let Some(_device) = fields.next() else { continue };
        let Some(mountpoint) = fields.next() else { continue };
        let Some(fstype) = fields.next() else { continue };
        if resolved.starts_with(mountpoint)
            && best.is_none_or(|(best_mp, _)| mountpoint.len() > best_mp.len())
        {
            best = Some((mountpoint, fstype));
        }
    }

    best.is_some_and(|(_, fstype)| NETWORK_FS_TYPES.contains(&fstype))
}

#[cfg(target_os = "macos")]
#[must_use]
pub fn is_network_fs(path: &Path) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(resolved) = std::fs::canonicalize(path) else {
        return false;
    };
    let Ok(cpath) = CString::new(resolved.as_os_str().as_bytes()) else {
        return false;
    };

    let mut buf: libc::statfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statfs(cpath.as_ptr(), &mut buf) };
    if rc != 0 {
        return false;
    }

    let raw_name: Vec<u8> = buf
        .f_fstypename
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as u8)
        .collect();
    let fstype = String::from_utf8_lossy(&raw_name).to_lowercase();
    NETWORK_FS_TYPES.contains(&fstype.as_str())
}

#[cfg(windows)]
#[must_use]
pub fn is_network_fs(path: &Path) -> bool {
    crate::windows::is_network_drive(path)
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
#[must_use]
pub fn is_network_fs(_path: &Path) -> bool {
    false
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn nonexistent_path_is_not_flagged() {
        assert!(!is_network_fs(Path::new("/nonexistent/does/not/exist")));
    }
}
