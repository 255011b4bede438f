//! Graceful shutdown of concurrent workers
//!
//! This library holds the pieces shared by the `workstop` binaries:
//! a one-shot stop signal, a completion tracker, the worker loop,
//! interruption sources, configuration parsing, command-line
//! interface handling and logging.

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod interrupt;
pub mod logging;
pub mod markers;
pub mod shutdown;
pub mod tracker;
pub mod worker;

pub use cli::{parse_args, Args};
pub use coordinator::{run_uncoordinated, Coordinator, Monitor, Phase, ShutdownReport};
pub use interrupt::{Interruption, InterruptionSource, OsSignals};
pub use logging::{log, log_with_worker, set_log_file};
pub use markers::{MarkerSink, Recorder, StdoutSink};
pub use shutdown::{StopSignal, StopWatch};
pub use tracker::{CompletionHandle, CompletionTracker};
pub use worker::WorkerSpec;

/// Name of the program used in usage and version output
pub const PROGRAM_NAME: &str = "workstop";

/// Current version of the program (from Cargo.toml)
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");
