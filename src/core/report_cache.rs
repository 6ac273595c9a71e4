// Deviscope - GPL-3.0-or-later
// This file is part of Deviscope.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// Deviscope is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Deviscope is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Deviscope.  If not, see <https://www.gnu.org/licenses/>.

//! Root-cause reports computed off the UI thread.
//!
//! The cache always hands out the newest finished report, even while a report for
//! a different cell is still being computed, so the panel never flashes empty.

use crate::analysis::{ImpactMatrix, RootCauseReport};
use crate::core::worker::JobSender;
use std::sync::Arc;
use tokio::sync::watch;

/// Worker slots for analysis jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnalysisSlot {
    RootCause,
}

/// Identifies one root-cause report
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportKey {
    /// Bumped whenever a new impact matrix arrives
    pub matrix_generation: u64,
    pub dimension: String,
    pub deviation: String,
    pub correlate: Option<String>,
    pub bins: usize,
    pub sample_limit: usize,
}

type Slot = Option<(ReportKey, Arc<RootCauseReport>)>;

pub struct ReportCache {
    pending: Option<ReportKey>,
    tx: watch::Sender<Slot>,
    rx: watch::Receiver<Slot>,
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportCache {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            pending: None,
            tx,
            rx,
        }
    }

    /// Newest finished report and the key it was computed for
    pub fn latest(&mut self) -> Slot {
        self.rx.borrow_and_update().clone()
    }

    /// Whether `key` has been requested but its report is not there yet
    #[must_use]
    pub fn is_computing(&self, key: &ReportKey) -> bool {
        self.pending.as_ref() == Some(key)
            && self.rx.borrow().as_ref().map(|(k, _)| k) != Some(key)
    }

    /// Make sure a report for `key` exists or is being computed.
    ///
    /// `notify` runs on the worker thread after the report is published.
    pub fn request<F>(
        &mut self,
        key: ReportKey,
        matrix: Arc<ImpactMatrix>,
        worker: &JobSender<AnalysisSlot>,
        notify: F,
    ) where
        F: FnOnce() + Send + 'static,
    {
        if self.pending.as_ref() == Some(&key) {
            return;
        }
        self.pending = Some(key.clone());

        let tx = self.tx.clone();
        let submitted = worker.submit(AnalysisSlot::RootCause, move || {
            let report = RootCauseReport::compute(
                &matrix,
                &key.dimension,
                &key.deviation,
                key.correlate.as_deref(),
                key.bins,
                key.sample_limit,
            );
            tx.send_replace(Some((key, Arc::new(report))));
            notify();
        });
        if !submitted {
            tracing::error!("Analysis worker is gone, root-cause report not computed");
            self.pending = None;
        }
    }

    /// Forget everything, e.g. after a session reset
    pub fn clear(&mut self) {
        self.pending = None;
        self.tx.send_replace(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::root_cause::{CellValue, MatrixRow};
    use crate::core::worker::JobWorker;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn matrix() -> Arc<ImpactMatrix> {
        let rows = (0..6)
            .map(|i| {
                let mut row = MatrixRow::new();
                row.insert("time".to_string(), CellValue::Number(f64::from(i) * 10.0));
                row.insert("(Skip A)".to_string(), CellValue::Number(f64::from(i % 2)));
                row
            })
            .collect();
        Arc::new(ImpactMatrix {
            columns: vec!["time".to_string(), "(Skip A)".to_string()],
            rows,
        })
    }

    fn key(generation: u64) -> ReportKey {
        ReportKey {
            matrix_generation: generation,
            dimension: "time".to_string(),
            deviation: "(Skip A)".to_string(),
            correlate: None,
            bins: 4,
            sample_limit: 10,
        }
    }

    #[test]
    fn test_report_is_published() {
        let worker = JobWorker::new("report-test");
        let mut cache = ReportCache::new();
        assert!(cache.latest().is_none());

        let (tx, rx) = channel();
        cache.request(key(1), matrix(), &worker.sender(), move || {
            let _ = tx.send(());
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let (done_key, report) = cache.latest().unwrap();
        assert_eq!(done_key, key(1));
        assert_eq!(report.dimension, "time");
        assert!(!cache.is_computing(&key(1)));
    }

    #[test]
    fn test_repeated_request_is_ignored() {
        let worker = JobWorker::new("report-test");
        let mut cache = ReportCache::new();
        let (tx, rx) = channel();
        let tx2 = tx.clone();
        cache.request(key(1), matrix(), &worker.sender(), move || {
            let _ = tx.send(1);
        });
        cache.request(key(1), matrix(), &worker.sender(), move || {
            let _ = tx2.send(2);
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_clear_drops_report() {
        let worker = JobWorker::new("report-test");
        let mut cache = ReportCache::new();
        let (tx, rx) = channel();
        cache.request(key(2), matrix(), &worker.sender(), move || {
            let _ = tx.send(());
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        cache.clear();
        assert!(cache.latest().is_none());
        assert!(!cache.is_computing(&key(2)));
    }
}
