//! Multi-host probing on a fixed pool of worker threads.
//!
//! Each host gets its own session and its own [`detect`] call; the compiled
//! catalog is shared read-only. Outcomes stream back as hosts finish and are
//! also available in submission order.

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread;

use crossbeam_channel as channel;

use super::detect::{ProbeOptions, ProbeReport, detect};
use crate::catalog::Catalog;
use crate::core::config::TargetConfig;
use crate::core::errors::Result;
use crate::session::{BoxedSession, open_target};

type Opener = Box<dyn FnOnce() -> Result<BoxedSession> + Send>;

/// One host waiting to be probed.
pub struct HostJob {
    label: String,
    open: Opener,
}

impl HostJob {
    /// Job whose session is produced by `open` on the worker thread.
    pub fn new<F>(label: impl Into<String>, open: F) -> Self
    where
        F: FnOnce() -> Result<BoxedSession> + Send + 'static,
    {
        Self {
            label: label.into(),
            open: Box::new(open),
        }
    }

    /// Job for a configured target.
    #[must_use]
    pub fn from_target(target: TargetConfig) -> Self {
        let label = target.display_label();
        Self::new(label, move || open_target(&target))
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for HostJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostJob").field("label", &self.label).finish()
    }
}

/// What happened on one host. A failed host never affects the others.
#[derive(Debug)]
pub struct HostOutcome {
    /// Position of the job in the submitted list.
    pub index: usize,
    /// Label the job was submitted under.
    pub label: String,
    pub result: Result<ProbeReport>,
}

impl HostOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Probes many hosts concurrently against one catalog.
#[derive(Debug, Clone)]
pub struct Fleet {
    catalog: Arc<Catalog>,
    options: ProbeOptions,
    parallelism: usize,
}

impl Fleet {
    pub fn new(catalog: Arc<Catalog>, options: ProbeOptions, parallelism: usize) -> Self {
        Self {
            catalog,
            options,
            parallelism: parallelism.max(1),
        }
    }

    /// Start probing and yield outcomes in completion order.
    ///
    /// The receiver disconnects once every job has reported.
    #[must_use]
    pub fn stream(&self, jobs: Vec<HostJob>) -> channel::Receiver<HostOutcome> {
        let workers = self.parallelism.min(jobs.len()).max(1);
        let (work_tx, work_rx) = channel::bounded::<(usize, HostJob)>(jobs.len().max(1));
        let (result_tx, result_rx) = channel::unbounded::<HostOutcome>();

        for item in jobs.into_iter().enumerate() {
            // Capacity covers every job and the receiver is alive.
            let _ = work_tx.send(item);
        }
        drop(work_tx);

        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let catalog = Arc::clone(&self.catalog);
            let options = self.options;

            thread::spawn(move || {
                fleet_worker(&work_rx, &result_tx, &catalog, options);
            });
        }

        result_rx
    }

    /// Probe every job and return outcomes in submission order.
    #[must_use]
    pub fn run(&self, jobs: Vec<HostJob>) -> Vec<HostOutcome> {
        let mut outcomes: Vec<HostOutcome> = self.stream(jobs).into_iter().collect();
        outcomes.sort_by_key(|outcome| outcome.index);
        outcomes
    }
}

fn fleet_worker(
    work_rx: &channel::Receiver<(usize, HostJob)>,
    result_tx: &channel::Sender<HostOutcome>,
    catalog: &Catalog,
    options: ProbeOptions,
) {
    while let Ok((index, job)) = work_rx.recv() {
        let HostJob { label, open } = job;
        let result = open().and_then(|session| detect(&*session, catalog, options));
        if result_tx
            .send(HostOutcome {
                index,
                label,
                result,
            })
            .is_err()
        {
            return;
        }
    }
}
