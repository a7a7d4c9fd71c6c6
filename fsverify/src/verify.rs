//! `verify_approved_path`: re-verification without opening (spec §4.3).

use warden_types::{ApprovedPath, FileIdentity};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("file was deleted since approval")]
    FileDeleted,
    #[error("stat failed: {0}")]
    StatFailed(String),
    #[error("parent directory is missing")]
    ParentMissing,
    #[error("parent directory changed identity since approval")]
    ParentChanged,
    #[error("target changed identity since approval")]
    InodeMismatch,
}

/// Re-stat the recorded path (or its parent, for a not-yet-created target)
/// and confirm its identity is unchanged since capture.
pub fn verify_approved_path(approved: &ApprovedPath) -> Result<(), VerifyError> {
    match approved {
        ApprovedPath::Existing {
            resolved_path,
            identity,
            ..
        } => {
            let meta = std::fs::metadata(resolved_path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VerifyError::FileDeleted
                } else {
                    VerifyError::StatFailed(e.to_string())
                }
            })?;
            if current_identity(&meta) == *identity {
                Ok(())
            } else {
                Err(VerifyError::InodeMismatch)
            }
        }
        ApprovedPath::New {
            parent_path,
            parent_identity,
            ..
        } => {
            let meta = std::fs::metadata(parent_path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VerifyError::ParentMissing
                } else {
                    VerifyError::StatFailed(e.to_string())
                }
            })?;
            if current_identity(&meta) == *parent_identity {
                Ok(())
            } else {
                Err(VerifyError::ParentChanged)
            }
        }
    }
}

#[cfg(unix)]
fn current_identity(meta: &std::fs::Metadata) -> FileIdentity {
    crate::unix::identity_of_metadata(meta)
}

#[cfg(windows)]
fn current_identity(meta: &std::fs::Metadata) -> FileIdentity {
    use std::os::windows::fs::MetadataExt;
    FileIdentity {
        device: u64::from(meta.volume_serial_number().unwrap_or_default()),
        inode: meta.file_index().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::capture_approved_path;
    use tempfile::tempdir;

    #[test]
    fn unmodified_file_verifies_ok() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.txt");
        std::fs::write(&path, b"hi").unwrap();
        let captured = capture_approved_path(&path).unwrap();

        std::fs::write(dir.path().join("unrelated.txt"), b"noise").unwrap();

        assert_eq!(verify_approved_path(&captured), Ok(()));
    }

    #[test]
    fn deleted_file_fails_verification() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.txt");
        std::fs::write(&path, b"hi").unwrap();
        let captured = capture_approved_path(&path).unwrap();

        std::fs::remove_file(&path).unwrap();

        assert_eq!(verify_approved_path(&captured), Err(VerifyError::FileDeleted));
    }

    #[test]
    fn swapped_file_fails_with_inode_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.txt");
        std::fs::write(&path, b"hi").unwrap();
        let captured = capture_approved_path(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, b"different inode now").unwrap();

        assert_eq!(verify_approved_path(&captured), Err(VerifyError::InodeMismatch));
    }

    #[test]
    fn nonexistent_target_verifies_against_unchanged_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let captured = capture_approved_path(&path).unwrap();

        assert_eq!(verify_approved_path(&captured), Ok(()));
    }
}
