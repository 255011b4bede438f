use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Latch {
    total: usize,
    remaining: Mutex<usize>,
    drained: Condvar,
}

impl Latch {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.remaining.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counts workers that have not finished yet
///
/// Created together with exactly one [`CompletionHandle`] per worker, so
/// the count can only go from N down to zero and never below.
#[derive(Clone, Debug)]
pub struct CompletionTracker {
    latch: Arc<Latch>,
}

/// One worker's right to report completion, used at most once
///
/// Reports on [`complete`](CompletionHandle::complete) or, failing that,
/// when dropped. Dropping also happens while a panic unwinds the worker, so
/// every exit path of the owning thread registers completion.
#[derive(Debug)]
pub struct CompletionHandle {
    latch: Option<Arc<Latch>>,
}

impl CompletionTracker {
    /// Creates a tracker for `count` workers and their handles
    pub fn new(count: usize) -> (Self, Vec<CompletionHandle>) {
        let latch = Arc::new(Latch {
            total: count,
            remaining: Mutex::new(count),
            drained: Condvar::new(),
        });
        let handles = (0..count)
            .map(|_| CompletionHandle {
                latch: Some(Arc::clone(&latch)),
            })
            .collect();
        (Self { latch }, handles)
    }

    /// Number of workers the tracker was created for
    pub fn total(&self) -> usize {
        self.latch.total
    }

    /// Number of workers that have not reported completion
    pub fn remaining(&self) -> usize {
        *self.latch.lock()
    }

    /// Blocks until every worker has reported completion
    pub fn wait(&self) {
        let mut remaining = self.latch.lock();
        while *remaining > 0 {
            remaining = self
                .latch
                .drained
                .wait(remaining)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until every worker has reported completion or `timeout` passed
    ///
    /// # Returns
    /// * `Ok(())` once the count reached zero
    /// * `Err(remaining)` with the unfinished count if the time ran out
    ///
    /// A timeout too large to form a deadline waits like [`wait`](Self::wait).
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), usize> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return Ok(());
        };
        let mut remaining = self.latch.lock();
        while *remaining > 0 {
            let now = Instant::now();
            if now >= deadline {
                return Err(*remaining);
            }
            remaining = self
                .latch
                .drained
                .wait_timeout(remaining, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        Ok(())
    }
}

impl CompletionHandle {
    /// Reports completion of the owning worker
    ///
    /// # Returns
    /// Number of workers still running after this one
    pub fn complete(mut self) -> usize {
        self.release().unwrap_or(0)
    }

    fn release(&mut self) -> Option<usize> {
        let latch = self.latch.take()?;
        let mut remaining = latch.lock();
        debug_assert!(*remaining > 0, "more completions than workers");
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            latch.drained.notify_all();
        }
        Some(*remaining)
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_new_tracker_counts_all_handles() {
        let (tracker, handles) = CompletionTracker::new(3);
        assert_eq!(handles.len(), 3);
        assert_eq!(tracker.total(), 3);
        assert_eq!(tracker.remaining(), 3);
    }

    #[test]
    fn test_complete_counts_down_to_zero() {
        let (tracker, mut handles) = CompletionTracker::new(3);
        assert_eq!(handles.pop().unwrap().complete(), 2);
        assert_eq!(handles.pop().unwrap().complete(), 1);
        assert_eq!(handles.pop().unwrap().complete(), 0);
        assert_eq!(tracker.remaining(), 0);
        tracker.wait();
    }

    #[test]
    fn test_drop_reports_completion_once() {
        let (tracker, mut handles) = CompletionTracker::new(2);
        drop(handles.pop());
        assert_eq!(tracker.remaining(), 1);

        // complete() followed by the implicit drop must count only once
        let last = handles.pop().unwrap();
        assert_eq!(last.complete(), 0);
        assert_eq!(tracker.remaining(), 0);
    }

    #[test]
    fn test_zero_workers_never_blocks() {
        let (tracker, handles) = CompletionTracker::new(0);
        assert!(handles.is_empty());
        tracker.wait();
        assert_eq!(tracker.wait_timeout(Duration::from_millis(1)), Ok(()));
    }

    #[test]
    fn test_panicking_thread_still_completes() {
        let (tracker, mut handles) = CompletionTracker::new(1);
        let handle = handles.pop().unwrap();

        let result = thread::spawn(move || {
            let _handle = handle;
            panic!("unit of work failed");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(tracker.remaining(), 0);
    }

    #[test]
    fn test_wait_blocks_until_last_completion() {
        let (tracker, handles) = CompletionTracker::new(4);
        let threads: Vec<_> = handles
            .into_iter()
            .enumerate()
            .map(|(i, handle)| {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(10 * (i as u64 + 1)));
                    handle.complete();
                })
            })
            .collect();

        tracker.wait();
        assert_eq!(tracker.remaining(), 0);
        for t in threads {
            t.join().unwrap();
        }
    }

    #[test]
    fn test_wait_timeout_reports_leaked_handle() {
        let (tracker, mut handles) = CompletionTracker::new(2);
        handles.pop().unwrap().complete();
        // A leaked handle is the only way to lose a completion
        std::mem::forget(handles.pop());

        assert_eq!(tracker.wait_timeout(Duration::from_millis(20)), Err(1));
    }

    #[test]
    fn test_wait_timeout_with_unrepresentable_deadline() {
        let (tracker, mut handles) = CompletionTracker::new(1);
        let handle = handles.pop().unwrap();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.complete();
        });

        assert_eq!(tracker.wait_timeout(Duration::MAX), Ok(()));
        assert_eq!(tracker.wait_timeout(Duration::from_secs(u64::MAX)), Ok(()));
        worker.join().unwrap();
    }

    #[test]
    fn test_concurrent_completions_are_not_lost() {
        let (tracker, handles) = CompletionTracker::new(64);
        let threads: Vec<_> = handles
            .into_iter()
            .map(|handle| thread::spawn(move || handle.complete()))
            .collect();

        let mut seen: Vec<usize> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        seen.sort_unstable();
        // Each completion saw a distinct remaining count, zero exactly once
        assert_eq!(seen, (0..64).collect::<Vec<_>>());
        assert_eq!(tracker.remaining(), 0);
    }
}
