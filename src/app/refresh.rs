//! Periodic refresh.
//!
//! Each refresh issues a fetch on a worker and renders on the caller's
//! thread when the response comes back. Responses can overtake each other
//! (a slow request issued first may finish last), so every request carries a
//! ticket and only responses newer than the last applied one are rendered.
//!
//! At most `workers` requests are outstanding. A tick that finds them all
//! busy is skipped rather than queued, so a slow API never builds a backlog.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::app::pipeline::{Fetched, RenderRequest, fetch, render_fetched};
use crate::data::JobSource;
use crate::error::AppError;
use crate::plot::Rendered;

/// Sequence number of an issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

/// Last-write-wins guard for out-of-order responses. Also counts requests
/// issued but not yet answered.
#[derive(Debug, Default)]
pub struct RefreshSequencer {
    issued: u64,
    applied: Option<Ticket>,
    in_flight: usize,
}

impl RefreshSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        self.in_flight += 1;
        Ticket(self.issued)
    }

    /// Issue a ticket unless `limit` requests are already outstanding.
    pub fn try_issue(&mut self, limit: usize) -> Option<Ticket> {
        (self.in_flight < limit).then(|| self.issue())
    }

    /// Record that a response (stale or not) has come back.
    pub fn received(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Whether the response to `ticket` should be applied. Accepting it
    /// makes every older ticket stale.
    pub fn accept(&mut self, ticket: Ticket) -> bool {
        if self.applied.is_some_and(|last| ticket <= last) {
            return false;
        }
        self.applied = Some(ticket);
        true
    }

    pub fn last_applied(&self) -> Option<Ticket> {
        self.applied
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub interval: Duration,
    /// Stop after this many requests; run forever when `None`.
    pub iterations: Option<usize>,
    pub workers: usize,
}

/// Counters of one `watch` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchStats {
    pub issued: usize,
    /// Ticks skipped because every worker was still busy.
    pub skipped: usize,
    pub rendered: usize,
}

/// Refresh every `interval`, calling `on_render` for each accepted response.
///
/// With an iteration limit, in-flight requests are awaited before returning.
pub fn watch<F>(
    source: Arc<dyn JobSource>,
    request: &RenderRequest,
    options: WatchOptions,
    mut on_render: F,
) -> Result<WatchStats, AppError>
where
    F: FnMut(&Rendered) -> Result<(), AppError>,
{
    let workers = options.workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("refresh-{i}"))
        .build()
        .map_err(|e| AppError::new(4, format!("Failed to start refresh workers: {e}")))?;

    let (tx, rx) = mpsc::channel::<(Ticket, Fetched)>();
    let mut sequencer = RefreshSequencer::new();
    let mut rendered = 0usize;
    let mut issued = 0usize;
    let mut skipped = 0usize;

    let mut apply = |ticket: Ticket, fetched: Fetched, sequencer: &mut RefreshSequencer| -> Result<(), AppError> {
        sequencer.received();
        if !sequencer.accept(ticket) {
            debug!(?ticket, "dropping stale response");
            return Ok(());
        }
        on_render(&render_fetched(&fetched, request))?;
        rendered += 1;
        Ok(())
    };

    while options.iterations.is_none_or(|n| issued < n) {
        if let Some(ticket) = sequencer.try_issue(workers) {
            issued += 1;
            let tx = tx.clone();
            let source = Arc::clone(&source);
            let selection = request.selection.clone();
            pool.spawn(move || {
                let fetched = fetch(source.as_ref(), &selection);
                // The receiver only goes away when `watch` has returned.
                let _ = tx.send((ticket, fetched));
            });
            debug!(?ticket, "issued refresh");
        } else {
            skipped += 1;
            debug!(in_flight = sequencer.in_flight(), "all workers busy, skipping refresh");
        }

        let deadline = Instant::now() + options.interval;
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            match rx.recv_timeout(remaining) {
                Ok((ticket, fetched)) => apply(ticket, fetched, &mut sequencer)?,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    drop(tx);
    for (ticket, fetched) in rx {
        apply(ticket, fetched, &mut sequencer)?;
    }
    info!(issued, skipped, rendered, "refresh loop finished");
    Ok(WatchStats {
        issued,
        skipped,
        rendered,
    })
}
