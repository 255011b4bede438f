use crate::interrupt::Interruption;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// One-shot broadcast stop flag
///
/// Owned by the coordinator. Workers only get a [`StopWatch`], which can
/// read the flag but never raise or reset it. Once raised the flag stays
/// raised for the lifetime of the signal.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    raised: Arc<AtomicBool>,
    /// Encoded cause of the first raise (0 = none, see `Interruption::code`)
    cause: Arc<AtomicU8>,
}

/// Read-only view of a [`StopSignal`]
#[derive(Clone, Debug)]
pub struct StopWatch {
    raised: Arc<AtomicBool>,
}

impl StopSignal {
    /// Creates an unset stop signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a read capability for a worker
    pub fn watch(&self) -> StopWatch {
        StopWatch {
            raised: Arc::clone(&self.raised),
        }
    }

    /// Raises the signal for every watcher
    ///
    /// Idempotent: raising an already raised signal is a no-op and keeps
    /// the original cause.
    ///
    /// # Returns
    /// `true` if this call was the one that raised the signal
    pub fn raise(&self, cause: Interruption) -> bool {
        // The cause is claimed first so a reader that sees the flag set
        // always finds a cause recorded.
        let first = self
            .cause
            .compare_exchange(0, cause.code(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        self.raised.store(true, Ordering::SeqCst);
        first
    }

    /// Checks if the signal has been raised
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Gets the interruption that raised the signal
    ///
    /// # Returns
    /// * `None` if the signal is still unset
    /// * `Some(cause)` of the first raise otherwise
    pub fn cause(&self) -> Option<Interruption> {
        Interruption::from_code(self.cause.load(Ordering::SeqCst))
    }
}

impl StopWatch {
    /// Checks if a stop was requested
    ///
    /// Workers call this before every unit of work.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
