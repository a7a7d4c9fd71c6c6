//! Captured filesystem identity: the TOCTOU-closing data model.

use std::path::PathBuf;

/// Device + inode pair (or the platform-native equivalent) identifying a
/// filesystem object at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FileIdentity {
    pub device: u64,
    pub inode: u64,
}

/// Captured filesystem identity for a single approved path.
///
/// A tagged union rather than a struct with nullable fields (spec §9): the
/// `existed` branch carries the target's own identity; the `new` branch
/// carries its parent's, since the target itself doesn't exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovedPath {
    Existing {
        user_path: PathBuf,
        resolved_path: PathBuf,
        identity: FileIdentity,
        is_network_fs: bool,
    },
    New {
        user_path: PathBuf,
        resolved_path: PathBuf,
        parent_path: PathBuf,
        parent_identity: FileIdentity,
        is_network_fs: bool,
    },
}

impl ApprovedPath {
    #[must_use]
    pub fn existed(&self) -> bool {
        matches!(self, Self::Existing { .. })
    }

    #[must_use]
    pub fn user_path(&self) -> &std::path::Path {
        match self {
            Self::Existing { user_path, .. } | Self::New { user_path, .. } => user_path,
        }
    }

    #[must_use]
    pub fn resolved_path(&self) -> &std::path::Path {
        match self {
            Self::Existing { resolved_path, .. } | Self::New { resolved_path, .. } => {
                resolved_path
            }
        }
    }

    #[must_use]
    pub fn is_network_fs(&self) -> bool {
        match self {
            Self::Existing { is_network_fs, .. } | Self::New { is_network_fs, .. } => {
                *is_network_fs
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existed_discriminates_variant() {
        let existing = ApprovedPath::Existing {
            user_path: "/tmp/t".into(),
            resolved_path: "/tmp/t".into(),
            identity: FileIdentity { device: 1, inode: 2 },
            is_network_fs: false,
        };
        assert!(existing.existed());

        let new = ApprovedPath::New {
            user_path: "/tmp/new".into(),
            resolved_path: "/tmp/new".into(),
            parent_path: "/tmp".into(),
            parent_identity: FileIdentity { device: 1, inode: 3 },
            is_network_fs: false,
        };
        assert!(!new.existed());
    }
}
