//! Same workers as `workstop`, without shutdown coordination
//!
//! Exits as soon as SIGINT or SIGTERM arrives. Units of work in flight are
//! cut short, so the output may end with a `started` that has no matching
//! `finished`. Kept for comparison with the coordinated binary.

use std::process;
use std::sync::Arc;
use workstop::{log, parse_args, run_uncoordinated, set_log_file, OsSignals, StdoutSink};

fn main() {
    let args = parse_args();
    if let Some(log_file) = &args.log_file {
        if let Err(e) = set_log_file(log_file) {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
    if args.grace.is_some() {
        let _ = log("Grace period has no effect without coordination, ignoring -g");
    }

    let specs = match args.worker_specs() {
        Ok(specs) => specs,
        Err(e) => {
            let _ = log(&format!("Error loading workers: {}", e));
            process::exit(1);
        }
    };

    let signals = match OsSignals::new() {
        Ok(signals) => signals,
        Err(e) => {
            let _ = log(&format!("Error setting signal handler: {}", e));
            process::exit(1);
        }
    };

    if let Err(e) = run_uncoordinated(specs, Arc::new(StdoutSink), signals) {
        let _ = log(&format!("Error starting workers: {}", e));
        process::exit(1);
    }
}
