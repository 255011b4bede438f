use crate::worker::{WorkerSpec, DEFAULT_PAUSE};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Error, ErrorKind};
use std::time::Duration;

/// Worker names become the first token of marker lines
static WORKER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("worker name pattern is valid"));

fn default_pause_ms() -> u64 {
    DEFAULT_PAUSE.as_millis() as u64
}

/// One worker definition (one line of the config file)
#[derive(Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Worker name used in markers (JSON field: name)
    pub name: String,
    /// Pause inside each unit of work in milliseconds (JSON field: pause_ms)
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
    /// Random extra pause upper bound in milliseconds (JSON field: jitter_ms)
    #[serde(default)]
    pub jitter_ms: u64,
}

impl WorkerConfig {
    pub fn to_spec(&self) -> WorkerSpec {
        WorkerSpec::new(self.name.clone(), Duration::from_millis(self.pause_ms))
            .with_jitter(Duration::from_millis(self.jitter_ms))
    }
}

/// Checks a worker name against the allowed pattern
///
/// # Errors
/// `InvalidInput` naming the offending worker
pub fn validate_name(name: &str) -> Result<(), Error> {
    if WORKER_NAME.is_match(name) {
        Ok(())
    } else {
        Err(Error::new(
            ErrorKind::InvalidInput,
            format!(
                "invalid worker name '{}': use letters, digits, '_', '.' or '-'",
                name
            ),
        ))
    }
}

/// Parses configuration file into worker definitions
///
/// # Arguments
/// * `filename` - Path to configuration file
///
/// # Errors
/// - File not found or unreadable
/// - Invalid JSON or unknown fields
/// - Invalid or duplicate worker name
/// - No worker defined
///
/// # File Format
/// JSONL format - one JSON object per line with fields:
/// name, pause_ms (default 1000), jitter_ms (default 0).
/// Empty lines and lines starting with `#` are skipped.
///
/// # Example
/// ```text
/// // let workers = parse_config("workers.jsonl")?;
/// ```
pub fn parse_config(filename: &str) -> Result<Vec<WorkerConfig>, Error> {
    let file = File::open(filename)?;
    let reader = BufReader::new(file);

    let mut configs = Vec::new();
    let mut names = HashSet::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let config: WorkerConfig = serde_json::from_str(line).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("invalid JSON on line {}: {}", line_num + 1, e),
            )
        })?;

        validate_name(&config.name).map_err(|e| {
            Error::new(ErrorKind::InvalidInput, format!("line {}: {}", line_num + 1, e))
        })?;

        if !names.insert(config.name.clone()) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("duplicate worker name '{}' on line {}", config.name, line_num + 1),
            ));
        }

        configs.push(config);
    }

    if configs.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("no workers defined in {}", filename),
        ));
    }

    Ok(configs)
}
