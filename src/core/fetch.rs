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

//! Background execution of backend requests.

use crate::backend::{execute, BackendClient, Reply, Request};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// Completion of a request started by [`Fetcher::dispatch`]
#[derive(Debug, Clone)]
pub struct FetchMessage {
    /// Session epoch the request was issued in
    pub epoch: u64,
    pub reply: Reply,
}

/// Run `request` on its own thread and send the reply to `tx`.
///
/// `notify` runs after the reply was delivered. A receiver that was dropped in
/// the meantime is fine; the reply is discarded.
fn spawn_fetch<F>(
    client: Arc<BackendClient>,
    request: Request,
    epoch: u64,
    tx: Sender<FetchMessage>,
    notify: F,
) where
    F: FnOnce() + Send + 'static,
{
    thread::spawn(move || {
        let what = request.describe();
        let start = std::time::Instant::now();
        tracing::debug!("{what} (epoch {epoch})");

        let reply = execute(&client, request);
        match reply.error() {
            Some(err) => tracing::warn!("{what} failed after {:?}: {err}", start.elapsed()),
            None => tracing::info!("{what} finished in {:?}", start.elapsed()),
        }

        if tx.send(FetchMessage { epoch, reply }).is_err() {
            tracing::debug!("Dropping reply for '{what}', nobody is listening");
            return;
        }
        notify();
    });
}

/// Multiplexes all in-flight requests onto one channel
pub struct Fetcher {
    client: Arc<BackendClient>,
    tx: Sender<FetchMessage>,
    rx: Receiver<FetchMessage>,
    in_flight: usize,
}

impl Fetcher {
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        let (tx, rx) = channel();
        Self {
            client: Arc::new(client),
            tx,
            rx,
            in_flight: 0,
        }
    }

    #[must_use]
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Start a request in the background
    pub fn dispatch(&mut self, request: Request, epoch: u64, ctx: &egui::Context) {
        let ctx = ctx.clone();
        self.in_flight += 1;
        spawn_fetch(
            Arc::clone(&self.client),
            request,
            epoch,
            self.tx.clone(),
            move || ctx.request_repaint(),
        );
    }

    /// Replies that arrived since the last poll
    pub fn poll(&mut self) -> Vec<FetchMessage> {
        let messages: Vec<FetchMessage> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(messages.len());
        messages
    }

    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_unreachable_backend_reports_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let client = Arc::new(BackendClient::new("http://127.0.0.1:9").unwrap());
        let (tx, rx) = channel();
        spawn_fetch(client, Request::DeviationOverview, 3, tx, || {});

        let message = rx.recv_timeout(Duration::from_secs(30)).unwrap();
        assert_eq!(message.epoch, 3);
        assert!(matches!(message.reply, Reply::DeviationOverview(Err(_))));
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let client = Arc::new(BackendClient::new("http://127.0.0.1:9").unwrap());
        let (tx, rx) = channel();
        drop(rx);
        let (done_tx, done_rx) = channel();
        spawn_fetch(client, Request::Reset, 0, tx, move || {
            let _ = done_tx.send(());
        });
        // notify is skipped when the reply cannot be delivered
        assert!(done_rx.recv_timeout(Duration::from_secs(30)).is_err());
    }

    #[test]
    fn test_fetcher_counts_in_flight_requests() {
        let client = BackendClient::new("http://127.0.0.1:9").unwrap();
        let mut fetcher = Fetcher::new(client);
        let ctx = egui::Context::default();
        fetcher.dispatch(Request::DeviationOverview, 1, &ctx);
        fetcher.dispatch(Request::ImpactMatrix, 1, &ctx);
        assert_eq!(fetcher.in_flight(), 2);

        let mut received = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(30);
        while received.len() < 2 && std::time::Instant::now() < deadline {
            received.extend(fetcher.poll());
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(received.len(), 2);
        assert_eq!(fetcher.in_flight(), 0);
        assert!(received.iter().all(|m| m.epoch == 1 && m.reply.error().is_some()));
    }
}
