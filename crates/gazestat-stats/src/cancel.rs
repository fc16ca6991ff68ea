use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Error returned when a computation observed a cancelled [`CancelToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("computation cancelled")]
pub struct Cancelled;

/// Cooperative cancellation flag shared between a caller and a running
/// computation.
///
/// Clones share the same flag. Long-running loops poll
/// [`CancelToken::check`] once per unit of work.
///
/// ```
/// use gazestat_stats::cancel::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// assert!(token.check().is_ok());
/// handle.cancel();
/// assert!(token.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
