//! Running-process detection through IPC endpoint enumeration.
//!
//! Many desktop applications hold a uniquely named pipe open for as long as
//! they run. One listing of the IPC namespace per session is enough to test
//! every signature: each endpoint name is lowercased once and checked for
//! every configured identifier substring.

#![allow(missing_docs)]

use serde::Serialize;

use crate::catalog::Catalog;
use crate::session::{ListingError, Session};

/// Evidence that one product is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunningMatch {
    pub product: String,
    /// Endpoint name as listed by the host.
    pub endpoint: String,
    /// Configured identifier that matched.
    pub identifier: String,
}

/// Result of one IPC namespace scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpcScan {
    matches: Vec<RunningMatch>,
    endpoint_count: usize,
}

impl IpcScan {
    /// Products seen running, in catalog order.
    #[must_use]
    pub fn matches(&self) -> &[RunningMatch] {
        &self.matches
    }

    #[must_use]
    pub fn get(&self, product: &str) -> Option<&RunningMatch> {
        self.matches.iter().find(|m| m.product == product)
    }

    #[must_use]
    pub fn is_running(&self, product: &str) -> bool {
        self.get(product).is_some()
    }

    /// Number of endpoints the host listed.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.endpoint_count
    }
}

/// List the IPC namespace once and match every signature against it.
///
/// A product is reported with the first endpoint (in listing order) that
/// contains any of its identifiers.
pub fn scan_running<S: Session + ?Sized>(
    session: &S,
    catalog: &Catalog,
) -> std::result::Result<IpcScan, ListingError> {
    let endpoints = session.list_ipc_endpoints()?;
    let signatures = catalog.signatures();
    let mut found: Vec<Option<RunningMatch>> = vec![None; signatures.len()];

    for endpoint in &endpoints {
        let lowered = endpoint.display_name.to_lowercase();
        for (slot, signature) in found.iter_mut().zip(signatures) {
            if slot.is_some() {
                continue;
            }
            if let Some(identifier) = signature.matching_pipe(&lowered) {
                *slot = Some(RunningMatch {
                    product: signature.name().to_string(),
                    endpoint: endpoint.display_name.clone(),
                    identifier: identifier.to_string(),
                });
            }
        }
    }

    Ok(IpcScan {
        matches: found.into_iter().flatten().collect(),
        endpoint_count: endpoints.len(),
    })
}
