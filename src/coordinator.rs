use crate::interrupt::{Interruption, InterruptionSource};
use crate::logging::log;
use crate::markers::MarkerSink;
use crate::shutdown::StopSignal;
use crate::tracker::CompletionTracker;
use crate::worker::{self, WorkerSpec};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Where a shutdown sequence currently stands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Stop not requested, workers active
    Running,
    /// Stop raised, no worker has acknowledged it yet
    StopRequested,
    /// At least one worker finished after the stop, others still running
    Draining,
    /// Every worker has finished
    Terminated,
}

/// Workers still running when the stop was raised, `usize::MAX` before that
#[derive(Clone, Debug)]
struct StopSnapshot(Arc<AtomicUsize>);

impl StopSnapshot {
    fn new() -> Self {
        Self(Arc::new(AtomicUsize::new(usize::MAX)))
    }

    fn record(&self, running: usize) {
        // Only the first stop counts; later raises are no-ops
        let _ = self
            .0
            .compare_exchange(usize::MAX, running, Ordering::SeqCst, Ordering::SeqCst);
    }

    fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read-only view of a running coordinator
#[derive(Clone, Debug)]
pub struct Monitor {
    stop: StopSignal,
    tracker: CompletionTracker,
    at_stop: StopSnapshot,
}

impl Monitor {
    /// Workers that ended before the stop (failed or panicked) do not count
    /// as acknowledging it: the phase moves to `Draining` only once a worker
    /// finishes after the stop was raised.
    pub fn phase(&self) -> Phase {
        if !self.stop.is_raised() {
            return Phase::Running;
        }
        let remaining = self.tracker.remaining();
        if remaining == 0 {
            Phase::Terminated
        } else if remaining >= self.at_stop.get() {
            Phase::StopRequested
        } else {
            Phase::Draining
        }
    }

    pub fn remaining(&self) -> usize {
        self.tracker.remaining()
    }

    pub fn stop_raised(&self) -> bool {
        self.stop.is_raised()
    }
}

/// Outcome of a completed shutdown
#[derive(Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Interruption that raised the stop signal
    pub cause: Interruption,
    /// Number of workers drained
    pub workers: usize,
    /// Workers whose thread ended in a panic
    pub panicked: Vec<String>,
}

/// Runs workers and shuts them down gracefully on interruption
///
/// Owns the stop signal and the completion tracker; workers only get a
/// `StopWatch` and their own `CompletionHandle`.
pub struct Coordinator {
    stop: StopSignal,
    tracker: CompletionTracker,
    at_stop: StopSnapshot,
    workers: Vec<(String, JoinHandle<usize>)>,
    grace: Option<Duration>,
}

impl Coordinator {
    /// Launches one thread per worker
    ///
    /// # Arguments
    /// * `specs` - Workers to run
    /// * `sink` - Destination of the work markers
    /// * `grace` - Longest wait for workers after the stop, `None` waits forever
    ///
    /// # Errors
    /// If a worker thread cannot be spawned. Workers already running are
    /// stopped and drained before the error is returned.
    pub fn start(
        specs: Vec<WorkerSpec>,
        sink: Arc<dyn MarkerSink>,
        grace: Option<Duration>,
    ) -> io::Result<Self> {
        let stop = StopSignal::new();
        let (tracker, handles) = CompletionTracker::new(specs.len());

        let mut workers = Vec::with_capacity(specs.len());
        let mut pending = specs.into_iter().zip(handles);
        while let Some((spec, done)) = pending.next() {
            let watch = stop.watch();
            let sink = Arc::clone(&sink);
            let name = spec.name.clone();
            let spawned = thread::Builder::new()
                .name(format!("worker-{}", name))
                .spawn(move || worker::run(&spec, watch, done, &*sink));

            match spawned {
                Ok(handle) => workers.push((name, handle)),
                Err(e) => {
                    let _ = log(&format!("Failed to spawn worker {}: {}", name, e));
                    // Releases the handles of workers that will never run
                    drop(pending);
                    stop.raise(Interruption::Requested);
                    tracker.wait();
                    return Err(e);
                }
            }
        }

        let _ = log(&format!("Started {} workers", workers.len()));
        Ok(Self {
            stop,
            tracker,
            at_stop: StopSnapshot::new(),
            workers,
            grace,
        })
    }

    pub fn monitor(&self) -> Monitor {
        Monitor {
            stop: self.stop.clone(),
            tracker: self.tracker.clone(),
            at_stop: self.at_stop.clone(),
        }
    }

    /// Raises the stop signal, remembering how many workers were running
    ///
    /// # Returns
    /// `true` if this call raised the signal
    fn request_stop(&self, cause: Interruption) -> bool {
        // Recorded before the raise so a monitor that sees the stop also sees it
        self.at_stop.record(self.tracker.remaining());
        self.stop.raise(cause)
    }

    /// Blocks until `source` reports an interruption, then shuts down
    ///
    /// Raises the stop signal once, hands `source` to a listener thread that
    /// ignores further interruptions, then waits for every worker. A source
    /// that closes without an interruption counts as `Interruption::Requested`.
    ///
    /// # Errors
    /// `TimedOut` if the grace period passes with workers still running
    pub fn await_interruption_then_shutdown<S>(self, mut source: S) -> io::Result<ShutdownReport>
    where
        S: InterruptionSource + 'static,
    {
        let cause = match source.next_interruption() {
            Some(cause) => cause,
            None => {
                let _ = log("Interruption source closed, shutting down");
                Interruption::Requested
            }
        };

        self.request_stop(cause);
        let _ = log(&format!(
            "Received {}, waiting for {} workers to finish",
            cause,
            self.tracker.remaining()
        ));

        let stop = self.stop.clone();
        let listener = thread::Builder::new()
            .name("interrupt-listener".to_string())
            .spawn(move || {
                while let Some(again) = source.next_interruption() {
                    if !stop.raise(again) {
                        let _ = log(&format!("Received {} during shutdown, ignoring", again));
                    }
                }
            });
        if let Err(e) = listener {
            let _ = log(&format!("Failed to spawn interrupt listener: {}", e));
        }

        self.drain(cause)
    }

    /// Raises the stop signal without an external interruption and shuts down
    pub fn shutdown(self) -> io::Result<ShutdownReport> {
        self.request_stop(Interruption::Requested);
        let cause = self.stop.cause().unwrap_or(Interruption::Requested);
        self.drain(cause)
    }

    fn drain(self, cause: Interruption) -> io::Result<ShutdownReport> {
        match self.grace {
            None => self.tracker.wait(),
            Some(grace) => {
                if let Err(unfinished) = self.tracker.wait_timeout(grace) {
                    let _ = log(&format!(
                        "Grace period of {:?} expired with {} workers still running",
                        grace, unfinished
                    ));
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!(
                            "{} of {} workers did not finish within {:?}",
                            unfinished,
                            self.tracker.total(),
                            grace
                        ),
                    ));
                }
            }
        }

        // Every worker has completed, so these joins only wait for thread exit
        let mut panicked = Vec::new();
        for (name, handle) in self.workers {
            if handle.join().is_err() {
                let _ = log(&format!("Worker {} panicked", name));
                panicked.push(name);
            }
        }

        let _ = log("All workers finished");
        Ok(ShutdownReport {
            cause,
            workers: self.tracker.total(),
            panicked,
        })
    }
}

/// Runs workers with no shutdown coordination at all
///
/// Workers are detached; this returns as soon as `source` reports an
/// interruption, and whatever units of work are in flight are cut short
/// when the process exits.
///
/// # Errors
/// If a worker thread cannot be spawned
pub fn run_uncoordinated<S>(
    specs: Vec<WorkerSpec>,
    sink: Arc<dyn MarkerSink>,
    mut source: S,
) -> io::Result<Interruption>
where
    S: InterruptionSource,
{
    for spec in specs {
        let sink = Arc::clone(&sink);
        thread::Builder::new()
            .name(format!("worker-{}", spec.name))
            .spawn(move || worker::run_forever(&spec, &*sink))?;
    }

    let cause = source
        .next_interruption()
        .unwrap_or(Interruption::Requested);
    let _ = log(&format!("Received {}, exiting without waiting for workers", cause));
    Ok(cause)
}
