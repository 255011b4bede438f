use chrono::Local;
use once_cell::sync::Lazy;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Global log file path protected by Mutex
///
/// When None, log lines go to stderr so that stdout only carries
/// the work markers emitted by workers.
pub static LOG_FILE: Lazy<Mutex<Option<String>>> = Lazy::new(|| Mutex::new(None));

/// Logs a message with timestamp to configured output
///
/// # Arguments
/// * `message` - The message to log
///
/// # Returns
/// * `io::Result<()>` - Ok on success, Err if writing fails
///
/// # Example
/// ```text
/// // log("Coordinator started").unwrap();
/// ```
pub fn log(message: &str) -> io::Result<()> {
    log_with_worker(message, None)
}

/// Logs a message with timestamp and optional worker name
///
/// Used by worker threads so their lines can be told apart
///
/// # Arguments
/// * `message` - The message to log
/// * `worker` - Optional worker name, rendered as `[name]`
///
/// # Returns
/// * `io::Result<()>` - Ok on success, Err if writing fails
pub fn log_with_worker(message: &str, worker: Option<&str>) -> io::Result<()> {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let log_message = match worker {
        Some(name) => format!("{} [{}] {}\n", timestamp, name, message),
        None => format!("{} {}\n", timestamp, message),
    };

    // A worker that panicked while logging must not silence everyone else
    let guard = LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner);
    match &*guard {
        Some(log_file) => {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)?;
            file.write_all(log_message.as_bytes())?;
        }
        None => {
            io::stderr().lock().write_all(log_message.as_bytes())?;
        }
    }

    Ok(())
}

/// Sets the path for the log file
///
/// Subsequent calls to `log` and `log_with_worker` append to this file.
///
/// # Errors
/// Returns `InvalidInput` if the path is not valid UTF-8
pub fn set_log_file<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let path_str = path.as_ref().to_str().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "log file path is not valid UTF-8")
    })?;
    *LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner) = Some(path_str.to_string());
    Ok(())
}
