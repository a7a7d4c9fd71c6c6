//! `verify_and_open_approved_path` and `create_file_in_verified_parent`
//! (spec §4.3): the operations that actually hand back an open descriptor.

use warden_types::ApprovedPath;

#[cfg(unix)]
pub type VerifiedFile = std::fs::File;
#[cfg(windows)]
pub type VerifiedFile = crate::windows::OwnedHandle;

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("path is a symlink, refusing to follow it")]
    Symlink,
    #[error("target changed identity since approval")]
    InodeMismatch,
    #[error("parent directory changed identity since approval")]
    ParentChanged,
    #[error("target already exists")]
    AlreadyExists,
    #[error("target path has no usable file name")]
    InvalidTargetName,
    #[error("approved path was not a pending-creation target")]
    NotNewTarget,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Open `approved` under its verified identity.
///
/// For an existing target, opens the original user-supplied path (never the
/// resolved one — it was already followed once at capture time and must not
/// be re-resolved) with symlink-nofollow semantics, then confirms the
/// descriptor's identity matches what was captured. For a new target,
/// delegates to [`create_file_in_verified_parent`].
pub fn verify_and_open_approved_path(approved: &ApprovedPath) -> Result<VerifiedFile, OpenError> {
    match approved {
        ApprovedPath::Existing { .. } => open_existing(approved),
        ApprovedPath::New { .. } => create_file_in_verified_parent(approved),
    }
}

#[cfg(unix)]
fn open_existing(approved: &ApprovedPath) -> Result<VerifiedFile, OpenError> {
    let ApprovedPath::Existing {
        user_path,
        identity,
        ..
    } = approved
    else {
        return Err(OpenError::NotNewTarget);
    };

    let file = crate::unix::open_nofollow(user_path).map_err(|e| {
        if crate::unix::is_symlink_error(&e) {
            OpenError::Symlink
        } else {
            OpenError::Io(e)
        }
    })?;
    let actual = crate::unix::fstat_identity(&file)?;
    if actual != *identity {
        // `file` drops here, closing the descriptor on every exit path.
        return Err(OpenError::InodeMismatch);
    }
    Ok(file)
}

#[cfg(unix)]
pub fn create_file_in_verified_parent(approved: &ApprovedPath) -> Result<VerifiedFile, OpenError> {
    let ApprovedPath::New {
        parent_path,
        parent_identity,
        resolved_path,
        ..
    } = approved
    else {
        return Err(OpenError::NotNewTarget);
    };

    let parent = crate::unix::open_dir_nofollow(parent_path).map_err(|e| {
        if crate::unix::is_symlink_error(&e) {
            OpenError::Symlink
        } else {
            OpenError::Io(e)
        }
    })?;
    let actual_parent_identity = crate::unix::fstat_identity(&parent)?;
    if actual_parent_identity != *parent_identity {
        return Err(OpenError::ParentChanged);
    }

    let basename = resolved_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or(OpenError::InvalidTargetName)?;

    crate::unix::openat_create_excl(&parent, basename).map_err(|e| {
        if crate::unix::is_already_exists_error(&e) {
            OpenError::AlreadyExists
        } else {
            OpenError::Io(e)
        }
    })
}

#[cfg(windows)]
fn open_existing(approved: &ApprovedPath) -> Result<VerifiedFile, OpenError> {
    let ApprovedPath::Existing {
        user_path,
        identity,
        ..
    } = approved
    else {
        return Err(OpenError::NotNewTarget);
    };

    let handle = crate::windows::open_nofollow(user_path)?;
    let actual = crate::windows::identity_of_handle(&handle)?;
    if actual != *identity {
        return Err(OpenError::InodeMismatch);
    }
    // A reparse point opened with FILE_FLAG_OPEN_REPARSE_POINT that turned
    // out not to be a symlink in disguise would still pass the identity
    // check above; genuine symlinks are rejected by the identity mismatch
    // once they're swapped in, matching the Unix guarantee for the TOCTOU
    // case this exists to catch.
    Ok(handle)
}

#[cfg(windows)]
pub fn create_file_in_verified_parent(approved: &ApprovedPath) -> Result<VerifiedFile, OpenError> {
    let ApprovedPath::New {
        parent_path,
        parent_identity,
        resolved_path,
        ..
    } = approved
    else {
        return Err(OpenError::NotNewTarget);
    };

    // No safe openat-relative-create primitive exists on Windows; re-verify
    // the parent's identity immediately before creating, narrowing but not
    // eliminating the race (see module docs and `DESIGN.md`).
    let parent_handle = crate::windows::open_nofollow(parent_path)?;
    let actual_parent_identity = crate::windows::identity_of_handle(&parent_handle)?;
    if actual_parent_identity != *parent_identity {
        return Err(OpenError::ParentChanged);
    }
    drop(parent_handle);

    match crate::windows::create_new_file(resolved_path) {
        Ok(handle) => Ok(handle),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(OpenError::AlreadyExists),
        Err(e) => Err(OpenError::Io(e)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::capture::capture_approved_path;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn opens_existing_file_under_verified_identity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.txt");
        std::fs::write(&path, b"hello").unwrap();
        let captured = capture_approved_path(&path).unwrap();

        let mut file = verify_and_open_approved_path(&captured).unwrap();
        let mut buf = String::new();
        file.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello");
    }

    #[test]
    fn symlink_swap_is_rejected_and_leaks_no_descriptor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.txt");
        std::fs::write(&path, b"hello").unwrap();
        let captured = capture_approved_path(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        std::os::unix::fs::symlink("/etc/passwd", &path).unwrap();

        let result = verify_and_open_approved_path(&captured);
        assert!(matches!(result, Err(OpenError::Symlink)));
    }

    #[test]
    fn swapped_regular_file_is_rejected_with_inode_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.txt");
        std::fs::write(&path, b"hello").unwrap();
        let captured = capture_approved_path(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, b"attacker-controlled").unwrap();

        let result = verify_and_open_approved_path(&captured);
        assert!(matches!(result, Err(OpenError::InodeMismatch)));
    }

    #[test]
    fn creates_new_file_in_verified_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new.txt");
        let captured = capture_approved_path(&path).unwrap();

        let _file = verify_and_open_approved_path(&captured).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn preexisting_child_at_creation_time_is_already_exists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new.txt");
        let captured = capture_approved_path(&path).unwrap();

        std::fs::write(&path, b"raced").unwrap();

        let result = verify_and_open_approved_path(&captured);
        assert!(matches!(result, Err(OpenError::AlreadyExists)));
    }
}
