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

//! Single background thread for analysis jobs.
//!
//! Jobs are submitted under a slot. When several jobs for the same slot queue up
//! before the thread gets to them, only the newest one runs.

use std::collections::BTreeMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

type Job = Box<dyn FnOnce() + Send>;

/// Cloneable submission side of a [`JobWorker`]
pub struct JobSender<S> {
    tx: Sender<(S, Job)>,
}

impl<S> Clone for JobSender<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S: Send + 'static> JobSender<S> {
    /// Queue `job`, superseding a not yet started job in the same slot.
    ///
    /// Returns false once the worker thread is gone.
    pub fn submit<F>(&self, slot: S, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send((slot, Box::new(job))).is_ok()
    }
}

/// Owns the worker thread; the thread exits when every [`JobSender`] is dropped
pub struct JobWorker<S> {
    sender: JobSender<S>,
    _thread: thread::JoinHandle<()>,
}

impl<S> JobWorker<S>
where
    S: Ord + std::fmt::Debug + Send + 'static,
{
    #[must_use]
    pub fn new(name: &str) -> Self {
        let (tx, rx) = channel();
        let name = name.to_string();
        let thread = thread::spawn(move || run(&name, &rx));

        Self {
            sender: JobSender { tx },
            _thread: thread,
        }
    }

    #[must_use]
    pub fn sender(&self) -> JobSender<S> {
        self.sender.clone()
    }
}

fn run<S: Ord + std::fmt::Debug>(name: &str, rx: &Receiver<(S, Job)>) {
    let mut queued: BTreeMap<S, Job> = BTreeMap::new();

    let collect = |queued: &mut BTreeMap<S, Job>| {
        for (slot, job) in rx.try_iter() {
            if queued.insert(slot, job).is_some() {
                tracing::trace!("{name}: superseded a queued job");
            }
        }
    };

    while let Ok((slot, job)) = rx.recv() {
        queued.insert(slot, job);
        collect(&mut queued);

        while let Some((slot, job)) = queued.pop_first() {
            tracing::trace!("{name}: running job for {slot:?}");
            job();
            collect(&mut queued);
        }
    }
    tracing::debug!("{name}: all senders gone, stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier, Mutex};
    use std::time::Duration;

    #[test]
    fn test_jobs_run() {
        let worker = JobWorker::new("test-worker");
        let (tx, rx) = channel();
        assert!(worker.sender().submit(1u8, move || {
            tx.send(42).unwrap();
        }));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn test_queued_job_in_same_slot_is_superseded() {
        let worker = JobWorker::new("test-worker");
        let sender = worker.sender();
        let ran = Arc::new(Mutex::new(Vec::new()));

        // Keep the thread busy so the next two jobs queue up behind it
        let gate = Arc::new(Barrier::new(2));
        let blocker = Arc::clone(&gate);
        sender.submit(0u8, move || {
            blocker.wait();
        });

        for value in [1, 2] {
            let ran = Arc::clone(&ran);
            sender.submit(1u8, move || ran.lock().unwrap().push(value));
        }
        let (done_tx, done_rx) = channel();
        sender.submit(2u8, move || done_tx.send(()).unwrap());

        gate.wait();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(*ran.lock().unwrap(), vec![2]);
    }
}
