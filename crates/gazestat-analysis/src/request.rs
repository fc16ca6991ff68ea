//! Last-request-wins sequencing.
//!
//! Interactive callers often start a new analysis before the previous one has
//! finished. [`RequestSequencer::begin`] issues a ticket for the new request
//! and cancels the token of the one before it; results delivered for a stale
//! ticket are discarded by [`RequestSequencer::accept`].
//!
//! ```
//! use gazestat_analysis::request::RequestSequencer;
//!
//! let sequencer = RequestSequencer::new();
//! let first = sequencer.begin();
//! let second = sequencer.begin();
//!
//! assert!(first.cancel_token().is_cancelled());
//! assert_eq!(sequencer.accept(&first, "old"), None);
//! assert_eq!(sequencer.accept(&second, "new"), Some("new"));
//! ```

use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use gazestat_stats::cancel::CancelToken;

/// Identifies one request issued by a [`RequestSequencer`].
#[derive(Debug, Clone)]
pub struct RequestTicket {
    id: u64,
    cancel: CancelToken,
}

impl RequestTicket {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Token to pass to the computation serving this request.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
    current: Mutex<Option<CancelToken>>,
}

impl RequestSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, cancelling the previous one.
    pub fn begin(&self) -> RequestTicket {
        let cancel = CancelToken::new();
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.replace(cancel.clone()) {
            previous.cancel();
        }
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket { id, cancel }
    }

    /// Whether `ticket` belongs to the most recent request.
    #[must_use]
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.id
    }

    /// Returns `result` if `ticket` is still current, `None` otherwise.
    pub fn accept<T>(&self, ticket: &RequestTicket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            tracing::debug!(ticket = ticket.id, "discarding stale result");
            None
        }
    }
}
