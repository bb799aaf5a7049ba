//! Session over a captured host snapshot.
//!
//! A snapshot is a JSON document describing what a host's shares and IPC
//! namespace looked like at capture time:
//!
//! ```json
//! {
//!   "identity": { "host": "10.0.0.5", "hostname": "WS01", "domain": "corp.local" },
//!   "shares": { "C$": { "Program Files": { "KeePass2": {} } } },
//!   "ipc": ["lastpass_server_pipe"],
//!   "denied": ["C$\\Users\\Administrator"]
//! }
//! ```
//!
//! Directories are nested objects; an empty object is a leaf. `ipc_error`
//! makes the IPC listing fail, `disconnected` makes every request fail with a
//! session-level error.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{DirEntry, IPC_SHARE, IpcEntry, ListingError, Session, TargetIdentity};
use crate::core::errors::{ProbeError, Result};

/// One directory in a snapshot tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotDir {
    pub children: BTreeMap<String, SnapshotDir>,
}

impl SnapshotDir {
    /// Insert a share-relative path (`\` or `/` separated), creating parents.
    pub fn insert_path(&mut self, path: &str) {
        let mut node = self;
        for segment in path.split(['\\', '/']).filter(|s| !s.is_empty()) {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }

    fn child(&self, name: &str) -> Option<&Self> {
        self.children.get(name).or_else(|| {
            self.children
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, dir)| dir)
        })
    }
}

/// Serializable description of one host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSnapshot {
    #[serde(default)]
    pub identity: TargetIdentity,
    #[serde(default)]
    pub shares: BTreeMap<String, SnapshotDir>,
    #[serde(default)]
    pub ipc: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipc_error: Option<String>,
    /// Share-qualified paths (`C$\Users\bob`) whose listing is denied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub denied: Vec<String>,
    #[serde(default)]
    pub disconnected: bool,
}

impl HostSnapshot {
    /// Parse a snapshot document.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load a snapshot document from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ProbeError::io(path, source))?;
        Self::from_json(&raw)
    }
}

/// Session that answers listings from a [`HostSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotSession {
    snapshot: HostSnapshot,
}

impl SnapshotSession {
    #[must_use]
    pub fn new(snapshot: HostSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        HostSnapshot::from_file(path).map(Self::new)
    }

    fn check_connected(&self) -> std::result::Result<(), ListingError> {
        if self.snapshot.disconnected {
            return Err(ListingError::SessionLost(
                "snapshot marked as disconnected".to_string(),
            ));
        }
        Ok(())
    }

    fn is_denied(&self, share: &str, path: &str) -> bool {
        let qualified = if path.is_empty() {
            share.to_string()
        } else {
            format!("{share}\\{path}")
        };
        self.snapshot
            .denied
            .iter()
            .any(|denied| denied.replace('/', "\\").eq_ignore_ascii_case(&qualified))
    }
}

impl Session for SnapshotSession {
    fn identity(&self) -> &TargetIdentity {
        &self.snapshot.identity
    }

    fn list_directory(
        &self,
        share: &str,
        path: &str,
    ) -> std::result::Result<Vec<DirEntry>, ListingError> {
        self.check_connected()?;
        if share.eq_ignore_ascii_case(IPC_SHARE) {
            return self.list_ipc_endpoints().map(|entries| {
                entries
                    .into_iter()
                    .map(|e| DirEntry::file(e.display_name))
                    .collect()
            });
        }
        if self.is_denied(share, path) {
            return Err(ListingError::AccessDenied);
        }

        let mut node = self
            .snapshot
            .shares
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(share))
            .map(|(_, dir)| dir)
            .ok_or_else(|| ListingError::Transport(format!("share {share} not present")))?;
        for segment in path.split(['\\', '/']).filter(|s| !s.is_empty()) {
            node = node.child(segment).ok_or(ListingError::NotFound)?;
        }

        Ok(node
            .children
            .iter()
            .map(|(name, dir)| DirEntry {
                name: name.clone(),
                is_dir: !dir.children.is_empty(),
            })
            .collect())
    }

    fn list_ipc_endpoints(&self) -> std::result::Result<Vec<IpcEntry>, ListingError> {
        self.check_connected()?;
        if let Some(reason) = &self.snapshot.ipc_error {
            return Err(ListingError::Transport(reason.clone()));
        }
        Ok(self.snapshot.ipc.iter().map(IpcEntry::new).collect())
    }
}
