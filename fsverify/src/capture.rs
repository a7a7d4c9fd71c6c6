//! `capture_approved_path` (spec §4.3).

use std::path::{Path, PathBuf};

use warden_types::{ApprovedPath, FileIdentity};

use crate::network_fs::is_network_fs;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("parent directory of {path} could not be statted: {source}")]
    ParentUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Capture the filesystem identity of `user_path` at approval time.
///
/// If the path exists, records its own `(device, inode)`. If it doesn't,
/// records the parent directory's identity instead, plus a best-effort
/// resolved path built from the canonicalised parent and the literal
/// basename — deliberately *not* further normalised (spec §9 open question:
/// preserve this verbatim rather than improve it, since a stronger
/// canonicalisation would change which targets a given allowlist covers).
pub fn capture_approved_path(user_path: &Path) -> Result<ApprovedPath, CaptureError> {
    match std::fs::metadata(user_path) {
        Ok(meta) => {
            let identity = identity_of(&meta);
            let resolved_path = std::fs::canonicalize(user_path).unwrap_or_else(|_| user_path.to_path_buf());
            let is_network_fs = is_network_fs(&resolved_path);
            Ok(ApprovedPath::Existing {
                user_path: user_path.to_path_buf(),
                resolved_path,
                identity,
                is_network_fs,
            })
        }
        Err(_) => {
            let parent = user_path.parent().unwrap_or_else(|| Path::new("."));
            let parent_meta =
                std::fs::metadata(parent).map_err(|source| CaptureError::ParentUnavailable {
                    path: parent.to_path_buf(),
                    source,
                })?;
            let parent_identity = identity_of(&parent_meta);
            let resolved_parent = std::fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
            let basename = user_path.file_name().unwrap_or_default();
            let resolved_path = resolved_parent.join(basename);
            let is_network_fs = is_network_fs(&resolved_parent);
            Ok(ApprovedPath::New {
                user_path: user_path.to_path_buf(),
                resolved_path,
                parent_path: resolved_parent,
                parent_identity,
                is_network_fs,
            })
        }
    }
}

#[cfg(unix)]
fn identity_of(meta: &std::fs::Metadata) -> FileIdentity {
    crate::unix::identity_of_metadata(meta)
}

#[cfg(windows)]
fn identity_of(meta: &std::fs::Metadata) -> FileIdentity {
    use std::os::windows::fs::MetadataExt;
    FileIdentity {
        device: u64::from(meta.volume_serial_number().unwrap_or_default()),
        inode: meta.file_index().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn existing_file_captures_its_own_identity() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("t.txt");
        std::fs::write(&file_path, b"hi").unwrap();

        let captured = capture_approved_path(&file_path).unwrap();
        assert!(captured.existed());
        assert!(!captured.is_network_fs());
    }

    #[test]
    fn nonexistent_file_captures_parent_identity() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("missing.txt");

        let captured = capture_approved_path(&file_path).unwrap();
        assert!(!captured.existed());
        match captured {
            ApprovedPath::New { parent_path, .. } => {
                assert_eq!(parent_path, std::fs::canonicalize(dir.path()).unwrap());
            }
            ApprovedPath::Existing { .. } => panic!("expected New variant"),
        }
    }

    #[test]
    fn missing_parent_is_an_error() {
        let result = capture_approved_path(Path::new("/no/such/parent/at/all/file.txt"));
        assert!(result.is_err());
    }
}
