//! Session adapter boundary: the only way the probe touches a remote host.
//!
//! A [`Session`] is an already-established, already-authenticated connection.
//! The probe needs exactly two primitives from it: list the immediate children
//! of a directory on a file share, and list the endpoints currently present in
//! the IPC namespace. Everything else (authentication, transport, timeouts)
//! belongs to the adapter.

pub mod local;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::TargetConfig;
use crate::core::errors::Result;

/// Share that exposes the named-pipe namespace on Windows hosts.
pub const IPC_SHARE: &str = "IPC$";

/// One child returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Short name of the entry, without any parent path.
    pub name: String,
    /// Whether the adapter knows the entry to be a directory.
    #[serde(default)]
    pub is_dir: bool,
}

impl DirEntry {
    #[must_use]
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }

    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }
}

/// One endpoint returned by an IPC namespace listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcEntry {
    /// Full display name of the endpoint (e.g. a pipe name).
    pub display_name: String,
}

impl IpcEntry {
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
        }
    }
}

/// Failure of a single listing request.
///
/// Every kind except [`ListingError::SessionLost`] is recovered locally by the
/// probe as "nothing here".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("path not found")]
    NotFound,
    #[error("access denied")]
    AccessDenied,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("session lost: {0}")]
    SessionLost(String),
}

impl ListingError {
    /// Whether the session itself is unusable, as opposed to one path failing.
    #[must_use]
    pub const fn is_session_fatal(&self) -> bool {
        matches!(self, Self::SessionLost(_))
    }

    /// Short stable label for logs and JSON output.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::Transport(_) => "transport",
            Self::SessionLost(_) => "session_lost",
        }
    }
}

/// Who the session is connected to. Used for labelling output only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetIdentity {
    /// Address or name the session was opened against.
    pub host: String,
    /// NetBIOS/DNS host name reported by the target, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Domain the target belongs to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Whether the session authenticated with Kerberos.
    #[serde(default)]
    pub kerberos: bool,
}

impl TargetIdentity {
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Label used in reports: the host, or `hostname.domain` for Kerberos sessions.
    #[must_use]
    pub fn label(&self) -> String {
        if !self.kerberos {
            return self.host.clone();
        }
        match (self.hostname.as_deref(), self.domain.as_deref()) {
            (Some(name), Some(domain)) if !name.is_empty() && !domain.is_empty() => {
                format!("{name}.{domain}")
            }
            (Some(name), _) if !name.is_empty() => name.to_string(),
            _ => self.host.clone(),
        }
    }
}

/// An established connection to one remote host.
///
/// Each call is one blocking round trip. Implementations apply their own
/// timeouts and must report a failure rather than hang.
pub trait Session {
    /// Identity of the connected host.
    fn identity(&self) -> &TargetIdentity;

    /// List the immediate children of `path` on `share`.
    ///
    /// `path` is share-relative, uses `\` as separator, and is empty for the
    /// share root.
    fn list_directory(
        &self,
        share: &str,
        path: &str,
    ) -> std::result::Result<Vec<DirEntry>, ListingError>;

    /// List the endpoints currently present in the IPC namespace.
    fn list_ipc_endpoints(&self) -> std::result::Result<Vec<IpcEntry>, ListingError>;
}

impl<S: Session + ?Sized> Session for &S {
    fn identity(&self) -> &TargetIdentity {
        (**self).identity()
    }

    fn list_directory(
        &self,
        share: &str,
        path: &str,
    ) -> std::result::Result<Vec<DirEntry>, ListingError> {
        (**self).list_directory(share, path)
    }

    fn list_ipc_endpoints(&self) -> std::result::Result<Vec<IpcEntry>, ListingError> {
        (**self).list_ipc_endpoints()
    }
}

impl<S: Session + ?Sized> Session for Box<S> {
    fn identity(&self) -> &TargetIdentity {
        (**self).identity()
    }

    fn list_directory(
        &self,
        share: &str,
        path: &str,
    ) -> std::result::Result<Vec<DirEntry>, ListingError> {
        (**self).list_directory(share, path)
    }

    fn list_ipc_endpoints(&self) -> std::result::Result<Vec<IpcEntry>, ListingError> {
        (**self).list_ipc_endpoints()
    }
}

/// Join a share-relative parent path and a child name with `\`.
#[must_use]
pub fn join_share_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}\\{child}")
    }
}

/// A session that can be handed to a worker thread.
pub type BoxedSession = Box<dyn Session + Send>;

impl TargetIdentity {
    /// Identity described by a configured target.
    #[must_use]
    pub fn from_target(target: &TargetConfig) -> Self {
        Self {
            host: target.host.clone(),
            hostname: target.hostname.clone(),
            domain: target.domain.clone(),
            kerberos: target.kerberos,
        }
    }

    /// Fill unset fields from `other`. Fields already set here win.
    #[must_use]
    pub fn merged_with(mut self, other: &Self) -> Self {
        if self.host.trim().is_empty() {
            self.host.clone_from(&other.host);
        }
        if self.hostname.is_none() {
            self.hostname.clone_from(&other.hostname);
        }
        if self.domain.is_none() {
            self.domain.clone_from(&other.domain);
        }
        self.kerberos |= other.kerberos;
        self
    }
}

/// Open the session backing a configured target.
pub fn open_target(target: &TargetConfig) -> Result<BoxedSession> {
    let identity = TargetIdentity::from_target(target);
    if let Some(path) = target.snapshot.as_deref() {
        let mut recorded = snapshot::HostSnapshot::from_file(path)?;
        recorded.identity = identity.merged_with(&recorded.identity);
        if recorded.identity.host.trim().is_empty() {
            recorded.identity.host = target.display_label();
        }
        return Ok(Box::new(snapshot::SnapshotSession::new(recorded)));
    }
    let session = local::LocalShareSession::open(identity, &target.shares, target.ipc_dir.clone())?;
    Ok(Box::new(session))
}
