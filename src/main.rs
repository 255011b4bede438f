use scopeguard::defer;
use std::process;
use std::sync::Arc;
use workstop::{log, parse_args, set_log_file, Coordinator, OsSignals, StdoutSink};

/// Logs the failure and exits 1
///
/// `process::exit` skips the `defer!` in `main`, so the closing line is
/// logged here.
fn fail(message: &str) -> ! {
    let _ = log(message);
    let _ = log("End of main()");
    process::exit(1);
}

fn main() {
    let args = parse_args();
    if let Some(log_file) = &args.log_file {
        if let Err(e) = set_log_file(log_file) {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }

    let _ = log("Begin of main()");
    defer! {
        let _ = log("End of main()");
    }

    let specs = args
        .worker_specs()
        .unwrap_or_else(|e| fail(&format!("Error loading workers: {}", e)));

    // Handlers go in before any worker exists, so an early Ctrl+C is queued
    // instead of killing the process
    let signals = OsSignals::new()
        .unwrap_or_else(|e| fail(&format!("Error setting signal handler: {}", e)));

    let coordinator = Coordinator::start(specs, Arc::new(StdoutSink), args.grace)
        .unwrap_or_else(|e| fail(&format!("Error starting workers: {}", e)));

    match coordinator.await_interruption_then_shutdown(signals) {
        Ok(report) => {
            let _ = log(&format!(
                "Shutdown after {} complete: {} workers finished, {} panicked",
                report.cause,
                report.workers,
                report.panicked.len()
            ));
        }
        // Exiting ends the threads still running
        Err(e) => fail(&format!("Shutdown incomplete: {}", e)),
    }
}
