//! Plain-text and JSON rendering of probe results.

#![allow(missing_docs)]

use serde::Serialize;

use super::detect::{Detection, Evidence, ProbeReport};
use super::fleet::HostOutcome;

/// Line printed for a host where nothing in the catalog was found.
pub const NONE_DETECTED: &str = "no known applications detected";

/// One-line summary of a detection, e.g.
/// `KeePass detected (C:\Program Files\KeePass2)` or
/// `LastPass detected (C:\ProgramData\LastPass) - RUNNING (pipe lastpass_x)`.
#[must_use]
pub fn detection_line(detection: &Detection) -> String {
    let mut line = format!("{} detected", detection.product);
    match (detection.evidence, detection.installed_path.as_deref()) {
        (Evidence::Installed | Evidence::Both, Some(path)) => {
            line.push_str(&format!(" ({path})"));
        }
        (Evidence::Running, _) => line.push_str(" (no install path found)"),
        _ => {}
    }
    if detection.evidence.is_running() {
        line.push_str(" - RUNNING");
        if let Some(endpoint) = detection.running_endpoint.as_deref() {
            line.push_str(&format!(" (pipe {endpoint})"));
        }
    }
    line
}

/// Human-readable lines for one host, without the host header.
///
/// With `verbose`, recovered listing failures and the request count follow.
#[must_use]
pub fn report_lines(report: &ProbeReport, verbose: bool) -> Vec<String> {
    let mut lines: Vec<String> = report.detections.iter().map(detection_line).collect();
    if lines.is_empty() {
        lines.push(NONE_DETECTED.to_string());
    }
    if let Some(failure) = &report.ipc_failure {
        lines.push(format!(
            "warning: IPC listing failed ({}): {}; running status unknown",
            failure.kind, failure.message
        ));
    }
    if verbose {
        for failure in &report.listing_failures {
            lines.push(format!(
                "listing {}\\{} failed ({}): {}",
                failure.share, failure.path, failure.kind, failure.message
            ));
        }
        lines.push(format!(
            "{} listings, {} IPC endpoints, {} ms",
            report.listings, report.ipc_endpoints, report.duration_ms
        ));
    }
    lines
}

/// Aggregate view over a multi-host run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    pub hosts: usize,
    pub failed_hosts: usize,
    pub hosts_with_detections: usize,
    pub detections: usize,
    pub running: usize,
}

impl FleetSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[HostOutcome]) -> Self {
        let mut summary = Self {
            hosts: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match &outcome.result {
                Ok(report) => {
                    if !report.is_empty() {
                        summary.hosts_with_detections += 1;
                    }
                    summary.detections += report.detections.len();
                    summary.running += report
                        .detections
                        .iter()
                        .filter(|d| d.evidence.is_running())
                        .count();
                }
                Err(_) => summary.failed_hosts += 1,
            }
        }
        summary
    }

    #[must_use]
    pub fn line(&self) -> String {
        format!(
            "{} host(s) probed, {} failed, {} detection(s) on {} host(s), {} running",
            self.hosts,
            self.failed_hosts,
            self.detections,
            self.hosts_with_detections,
            self.running
        )
    }
}

/// JSON document for one host outcome.
#[must_use]
pub fn outcome_json(outcome: &HostOutcome) -> serde_json::Value {
    match &outcome.result {
        Ok(report) => serde_json::json!({
            "host": outcome.label,
            "ok": true,
            "report": report,
        }),
        Err(err) => serde_json::json!({
            "host": outcome.label,
            "ok": false,
            "error_code": err.code(),
            "error": err.to_string(),
        }),
    }
}
