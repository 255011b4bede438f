use crate::logging::log_with_worker;
use crate::markers::MarkerSink;
use crate::shutdown::StopWatch;
use crate::tracker::CompletionHandle;
use rand::Rng;
use scopeguard::defer;
use std::io;
use std::thread;
use std::time::Duration;

/// Pause of one unit of work when nothing else is configured
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(1000);

/// Description of one worker
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSpec {
    /// Name used in markers and log lines
    pub name: String,
    /// Fixed part of the pause inside each unit of work
    pub pause: Duration,
    /// Upper bound of the random extra pause added to `pause`
    pub jitter: Duration,
}

impl WorkerSpec {
    pub fn new(name: impl Into<String>, pause: Duration) -> Self {
        Self {
            name: name.into(),
            pause,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn next_pause(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.pause;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        self.pause + Duration::from_millis(extra)
    }
}

/// Performs one unit of work: `started` marker, pause, `finished` marker
fn unit_of_work(spec: &WorkerSpec, sink: &dyn MarkerSink) -> io::Result<()> {
    sink.emit(&format!("{} started", spec.name))?;
    thread::sleep(spec.next_pause());
    sink.emit(&format!("{} finished", spec.name))
}

/// Runs units of work until `stop` is raised, then reports completion
///
/// The stop flag is checked before every unit, never during one: a unit that
/// has started always runs to its `finished` marker. `done` is consumed on
/// every way out of this function (stop, failed unit, or panic), so the
/// coordinator is never left waiting on this worker.
///
/// # Returns
/// Number of units of work completed
pub fn run(spec: &WorkerSpec, stop: StopWatch, done: CompletionHandle, sink: &dyn MarkerSink) -> usize {
    let name = spec.name.as_str();
    let _ = log_with_worker("Worker started", Some(name));
    defer! {
        let _ = log_with_worker("Worker exited", Some(name));
    }

    let mut units = 0;
    loop {
        if stop.is_stopped() {
            let _ = log_with_worker("Stop requested, leaving work loop", Some(name));
            break;
        }
        if let Err(e) = unit_of_work(spec, sink) {
            let _ = log_with_worker(&format!("Unit of work failed: {}", e), Some(name));
            break;
        }
        units += 1;
    }

    let remaining = done.complete();
    let _ = log_with_worker(
        &format!("Completed {} units, {} workers still running", units, remaining),
        Some(name),
    );
    units
}

/// Runs units of work forever, ignoring any shutdown
///
/// Whatever unit is in flight when the process exits is cut short.
pub fn run_forever(spec: &WorkerSpec, sink: &dyn MarkerSink) {
    let name = spec.name.as_str();
    let _ = log_with_worker("Worker started without shutdown coordination", Some(name));
    loop {
        if let Err(e) = unit_of_work(spec, sink) {
            let _ = log_with_worker(&format!("Unit of work failed: {}", e), Some(name));
            return;
        }
    }
}
