//! Per-session entry point: run both detectors over the whole catalog.

#![allow(missing_docs)]

use std::time::Instant;

use serde::Serialize;

use super::ipc::{IpcScan, scan_running};
use super::resolver::{Diagnostics, ListingFailure, PathResolver, ResolveOptions};
use crate::catalog::Catalog;
use crate::core::errors::{ProbeError, Result};
use crate::session::{IPC_SHARE, Session};

/// Which signal identified a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    Installed,
    Running,
    Both,
}

impl Evidence {
    /// Combine the two independent signals; `None` when neither fired.
    #[must_use]
    pub const fn from_signals(installed: bool, running: bool) -> Option<Self> {
        match (installed, running) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Installed),
            (false, true) => Some(Self::Running),
            (false, false) => None,
        }
    }

    #[must_use]
    pub const fn is_installed(self) -> bool {
        matches!(self, Self::Installed | Self::Both)
    }

    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running | Self::Both)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Running => "running",
            Self::Both => "installed+running",
        }
    }
}

/// A positive detection for one product. Products with no signal produce no
/// record at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub product: String,
    pub evidence: Evidence,
    /// Concrete path that satisfied the first resolving pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    /// IPC endpoint that identified the running process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_endpoint: Option<String>,
}

/// Everything one probe run learned about one host.
///
/// `detections` holds positive results only; a product with neither signal is
/// absent, and the serialized form has no `matched` field. Consumers test
/// membership, or the `evidence` value, instead.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub target: String,
    pub started_at: String,
    pub duration_ms: u64,
    pub detections: Vec<Detection>,
    /// Set when the IPC namespace could not be listed; running evidence is
    /// then absent for every product.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipc_failure: Option<ListingFailure>,
    pub ipc_endpoints: usize,
    pub listing_failures: Vec<ListingFailure>,
    pub listings: usize,
}

impl ProbeReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    #[must_use]
    pub fn detection(&self, product: &str) -> Option<&Detection> {
        self.detections.iter().find(|d| d.product == product)
    }
}

/// Probe-wide options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeOptions {
    pub resolve: ResolveOptions,
}

/// Probe one session against the catalog.
///
/// The IPC namespace is listed once up front. A failure there is recorded in
/// the report and path detection still runs. Path patterns are tried in
/// catalog order, stopping at a product's first match. Only a session-level
/// failure is returned as an error.
pub fn detect<S: Session + ?Sized>(
    session: &S,
    catalog: &Catalog,
    options: ProbeOptions,
) -> Result<ProbeReport> {
    let started = Instant::now();
    let started_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let target = session.identity().label();

    let mut diagnostics = Diagnostics::new();
    diagnostics.record_listing();
    let (ipc, ipc_failure) = match scan_running(session, catalog) {
        Ok(scan) => (scan, None),
        Err(err) if err.is_session_fatal() => {
            return Err(ProbeError::Session {
                target,
                details: err.to_string(),
            });
        }
        Err(err) => {
            let mut failure = Diagnostics::new();
            failure.record_failure(IPC_SHARE, "", &err);
            (IpcScan::default(), failure.into_failures().pop())
        }
    };

    let resolver = PathResolver::new(session, options.resolve);
    let mut detections = Vec::new();
    for signature in catalog.signatures() {
        let installed = resolver.first_matching(signature.patterns(), &mut diagnostics)?;
        let running = ipc.get(signature.name());
        let Some(evidence) = Evidence::from_signals(installed.is_some(), running.is_some()) else {
            continue;
        };
        let (installed_path, matched_pattern) = installed.map_or((None, None), |(pattern, path)| {
            (
                Some(pattern.display_path(&path)),
                Some(pattern.as_str().to_string()),
            )
        });
        detections.push(Detection {
            product: signature.name().to_string(),
            evidence,
            installed_path,
            matched_pattern,
            running_endpoint: running.map(|m| m.endpoint.clone()),
        });
    }

    let listings = diagnostics.listing_count();
    Ok(ProbeReport {
        target,
        started_at,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        detections,
        ipc_failure,
        ipc_endpoints: ipc.endpoint_count(),
        listing_failures: diagnostics.into_failures(),
        listings,
    })
}
