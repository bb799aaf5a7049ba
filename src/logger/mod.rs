//! Activity logging: probe events as JSONL with graceful degradation.

pub mod jsonl;

use crate::probe::detect::{Detection, ProbeReport};
use crate::probe::fleet::HostOutcome;
use jsonl::{EventType, JsonlWriter, LogEntry, Severity};

/// Turns probe results into activity log entries.
pub struct ActivityLog {
    writer: JsonlWriter,
}

impl ActivityLog {
    #[must_use]
    pub fn new(writer: JsonlWriter) -> Self {
        Self { writer }
    }

    /// Log that drops every entry.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(JsonlWriter::discard())
    }

    pub fn write(&mut self, entry: &LogEntry) {
        self.writer.write_entry(entry);
    }

    pub fn config_loaded(&mut self, config_path: &str, config_hash: &str, signatures: usize) {
        self.write(
            &LogEntry::new(EventType::ConfigLoaded, Severity::Info)
                .with_path(config_path)
                .with_details(format!("hash={config_hash} signatures={signatures}")),
        );
    }

    pub fn probe_start(&mut self, target: &str) {
        self.write(&LogEntry::new(EventType::ProbeStart, Severity::Info).with_target(target));
    }

    /// Everything one host produced: detections, recovered failures, and a
    /// completion (or session error) record.
    pub fn host_outcome(&mut self, outcome: &HostOutcome) {
        match &outcome.result {
            Ok(report) => self.report(report),
            Err(err) => self.write(
                &LogEntry::new(EventType::SessionError, Severity::Error)
                    .with_target(&outcome.label)
                    .with_error(err.code(), err.to_string()),
            ),
        }
    }

    fn report(&mut self, report: &ProbeReport) {
        for detection in &report.detections {
            // A product seen both ways gets one event per signal.
            if detection.evidence.is_installed() {
                self.detection_event(
                    EventType::InstalledDetected,
                    &report.target,
                    detection,
                    detection.installed_path.as_deref(),
                );
            }
            if detection.evidence.is_running() {
                self.detection_event(
                    EventType::RunningDetected,
                    &report.target,
                    detection,
                    detection.running_endpoint.as_deref(),
                );
            }
        }

        if let Some(failure) = &report.ipc_failure {
            self.write(
                &LogEntry::new(EventType::IpcListingFailed, Severity::Warning)
                    .with_target(&report.target)
                    .with_share(&failure.share)
                    .with_error(failure.kind, &failure.message),
            );
        }
        for failure in &report.listing_failures {
            self.write(
                &LogEntry::new(EventType::ListingFailed, Severity::Warning)
                    .with_target(&report.target)
                    .with_share(&failure.share)
                    .with_path(&failure.path)
                    .with_error(failure.kind, &failure.message),
            );
        }

        self.write(
            &LogEntry::new(EventType::ProbeComplete, Severity::Info)
                .with_target(&report.target)
                .with_duration_ms(report.duration_ms)
                .with_details(format!(
                    "detections={} listings={}",
                    report.detections.len(),
                    report.listings
                )),
        );
    }

    fn detection_event(
        &mut self,
        event: EventType,
        target: &str,
        detection: &Detection,
        path: Option<&str>,
    ) {
        let mut entry = LogEntry::new(event, Severity::Info)
            .with_target(target)
            .with_product(&detection.product)
            .with_evidence(detection.evidence.label());
        if let Some(path) = path {
            entry = entry.with_path(path);
        }
        self.write(&entry);
    }

    pub fn flush(&mut self) {
        self.writer.flush();
    }

    #[must_use]
    pub fn state(&self) -> &'static str {
        self.writer.state()
    }
}
