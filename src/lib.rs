#![forbid(unsafe_code)]

//! Remote application presence probe.
//!
//! Given an established session to a remote Windows-style host, decide which
//! applications from a signature catalog are installed (a wildcard path
//! pattern resolves to an existing directory on an administrative share) and
//! which are running (an IPC endpoint name contains one of the product's
//! identifiers). The remote filesystem is only ever listed, never globbed, so
//! wildcard patterns are expanded one segment at a time.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use app_presence_probe::prelude::*;
//!
//! # fn main() -> app_presence_probe::core::errors::Result<()> {
//! let catalog = Catalog::builtin(CasePolicy::default())?;
//! let session = SnapshotSession::from_file(std::path::Path::new("ws01.json"))?;
//! let report = detect(&session, &catalog, ProbeOptions::default())?;
//! for detection in &report.detections {
//!     println!("{} {}", detection.product, detection.evidence.label());
//! }
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod catalog;
pub mod core;
pub mod logger;
pub mod probe;
pub mod session;
