//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use app_presence_probe::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, TargetConfig};
pub use crate::core::errors::{ProbeError, Result};

// Catalog
pub use crate::catalog::{Catalog, Signature, SignatureSchema};

// Probe
pub use crate::probe::detect::{Detection, Evidence, ProbeOptions, ProbeReport, detect};
pub use crate::probe::fleet::{Fleet, HostJob, HostOutcome};
pub use crate::probe::glob::CasePolicy;
pub use crate::probe::pattern::PathPattern;
pub use crate::probe::resolver::{Diagnostics, PathResolver, ResolveOptions};

// Sessions
pub use crate::session::local::LocalShareSession;
pub use crate::session::snapshot::{HostSnapshot, SnapshotSession};
pub use crate::session::{DirEntry, IpcEntry, ListingError, Session, TargetIdentity, open_target};
