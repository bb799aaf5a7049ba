//! Session over locally mounted shares.
//!
//! Each remote share is mapped to a local directory (a CIFS mount, a copied
//! image, or on Windows the UNC path itself). The IPC namespace is an optional
//! directory whose entries are the endpoints; on Windows `\\.\pipe\` lists the
//! live named pipes.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{DirEntry, IPC_SHARE, IpcEntry, ListingError, Session, TargetIdentity};
use crate::core::errors::{ProbeError, Result};

/// Session backed by local directories standing in for remote shares.
#[derive(Debug, Clone)]
pub struct LocalShareSession {
    identity: TargetIdentity,
    shares: BTreeMap<String, PathBuf>,
    ipc_dir: Option<PathBuf>,
}

impl LocalShareSession {
    /// Open a session. Every mapped share root must exist; a missing root is
    /// a session-level failure.
    pub fn open(
        identity: TargetIdentity,
        shares: &BTreeMap<String, PathBuf>,
        ipc_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let mut normalized = BTreeMap::new();
        for (share, root) in shares {
            if !root.is_dir() {
                return Err(ProbeError::Session {
                    target: identity.label(),
                    details: format!("share {share} root {} is not a directory", root.display()),
                });
            }
            normalized.insert(share.to_ascii_uppercase(), root.clone());
        }
        Ok(Self {
            identity,
            shares: normalized,
            ipc_dir,
        })
    }

    fn share_root(&self, share: &str) -> std::result::Result<&Path, ListingError> {
        let root = self
            .shares
            .get(&share.to_ascii_uppercase())
            .ok_or_else(|| ListingError::Transport(format!("share {share} is not mapped")))?;
        if !root.is_dir() {
            return Err(ListingError::SessionLost(format!(
                "share {share} root {} disappeared",
                root.display()
            )));
        }
        Ok(root)
    }
}

impl Session for LocalShareSession {
    fn identity(&self) -> &TargetIdentity {
        &self.identity
    }

    fn list_directory(
        &self,
        share: &str,
        path: &str,
    ) -> std::result::Result<Vec<DirEntry>, ListingError> {
        if share.eq_ignore_ascii_case(IPC_SHARE) {
            return self.list_ipc_endpoints().map(|entries| {
                entries
                    .into_iter()
                    .map(|e| DirEntry::file(e.display_name))
                    .collect()
            });
        }

        let mut dir = self.share_root(share)?.to_path_buf();
        for segment in path.split(['\\', '/']).filter(|s| !s.is_empty()) {
            // Never let a listing escape the mapped share root.
            if segment == ".." || segment == "." {
                return Err(ListingError::AccessDenied);
            }
            dir.push(segment);
        }
        read_children(&dir)
    }

    fn list_ipc_endpoints(&self) -> std::result::Result<Vec<IpcEntry>, ListingError> {
        let Some(ipc_dir) = &self.ipc_dir else {
            return Err(ListingError::Transport(
                "IPC namespace is not mapped for this target".to_string(),
            ));
        };
        Ok(read_children(ipc_dir)?
            .into_iter()
            .map(|entry| IpcEntry::new(entry.name))
            .collect())
    }
}

fn read_children(dir: &Path) -> std::result::Result<Vec<DirEntry>, ListingError> {
    let iter = fs::read_dir(dir).map_err(|err| map_io_error(&err))?;
    let mut entries = Vec::new();
    for entry in iter {
        let entry = entry.map_err(|err| map_io_error(&err))?;
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
        });
    }
    Ok(entries)
}

fn map_io_error(err: &std::io::Error) -> ListingError {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::NotADirectory => ListingError::NotFound,
        ErrorKind::PermissionDenied => ListingError::AccessDenied,
        _ => ListingError::Transport(err.to_string()),
    }
}
