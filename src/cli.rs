use crate::config::{parse_config, validate_name};
use crate::worker::{WorkerSpec, DEFAULT_PAUSE};
use std::env;
use std::io;
use std::process;
use std::time::Duration;

/// Worker names used when neither `-w` nor a config file is given
pub const DEFAULT_WORKERS: [&str; 3] = ["A", "B", "C"];

/// Command line options
#[derive(Debug, PartialEq)]
pub struct Args {
    /// Path to log file (None for stderr)
    pub log_file: Option<String>,
    /// Path to the JSONL worker config
    pub config_file: Option<String>,
    /// Worker names from `-w`
    pub workers: Vec<String>,
    /// Pause of each unit of work from `-p`
    pub pause: Duration,
    /// Grace period for workers to finish after the stop (None waits forever)
    pub grace: Option<Duration>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            log_file: None,
            config_file: None,
            workers: DEFAULT_WORKERS.iter().map(|n| n.to_string()).collect(),
            pause: DEFAULT_PAUSE,
            grace: None,
        }
    }
}

impl Args {
    /// Builds the worker list, from the config file if one was given
    ///
    /// # Errors
    /// Any error from reading or validating the config file
    pub fn worker_specs(&self) -> io::Result<Vec<WorkerSpec>> {
        match &self.config_file {
            Some(path) => Ok(parse_config(path)?.iter().map(|c| c.to_spec()).collect()),
            None => Ok(self
                .workers
                .iter()
                .map(|name| WorkerSpec::new(name.clone(), self.pause))
                .collect()),
        }
    }
}

/// What the command line asked for
#[derive(Debug, PartialEq)]
pub enum Command {
    Run(Args),
    Help,
    Version,
}

/// Prints usage instructions for the program.
pub fn print_usage(program: &str) {
    println!(
        "Usage: {} [-h] [-v] [-l logfile] [-g grace_seconds] [-p pause_ms] [-w names] [config_file]",
        program
    );
}

fn next_number<I: Iterator<Item = String>>(args: &mut I, what: &str) -> Result<u64, String> {
    match args.next() {
        Some(arg) => match arg.parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!("{} must be a positive number", what)),
        },
        None => Err(format!("Missing {} argument", what.to_lowercase())),
    }
}

/// Parses arguments (without the program name)
///
/// # Errors
/// A message describing the first invalid or missing argument
pub fn parse_from<I: IntoIterator<Item = String>>(args: I) -> Result<Command, String> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" => return Ok(Command::Help),
            "-v" => return Ok(Command::Version),
            "-l" => {
                parsed.log_file = Some(args.next().ok_or("Missing log file argument")?);
            }
            "-g" => {
                parsed.grace = Some(Duration::from_secs(next_number(&mut args, "Grace seconds")?));
            }
            "-p" => {
                parsed.pause = Duration::from_millis(next_number(&mut args, "Pause")?);
            }
            "-w" => {
                let list = args.next().ok_or("Missing worker names argument")?;
                let names: Vec<String> = list.split(',').map(|n| n.trim().to_string()).collect();
                for name in &names {
                    validate_name(name).map_err(|e| e.to_string())?;
                }
                parsed.workers = names;
            }
            _ => {
                if parsed.config_file.is_none() && !arg.starts_with('-') {
                    parsed.config_file = Some(arg);
                } else {
                    return Err(format!("Unexpected argument: {}", arg));
                }
            }
        }
    }

    Ok(Command::Run(parsed))
}

/// Parses command line arguments, exiting on `-h`, `-v` and errors
///
/// # Example
/// ```text
/// // let args = parse_args();
/// ```
pub fn parse_args() -> Args {
    let mut argv = env::args();
    let program = argv.next().unwrap_or_else(|| crate::PROGRAM_NAME.to_string());

    match parse_from(argv) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            print_usage(&program);
            process::exit(0);
        }
        Ok(Command::Version) => {
            println!("{} version {}", crate::PROGRAM_NAME, crate::PROGRAM_VERSION);
            process::exit(0);
        }
        Err(message) => {
            eprintln!("Error: {}", message);
            print_usage(&program);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Result<Command, String> {
        parse_from(args.iter().map(|a| a.to_string()))
    }

    fn run_args(args: &[&str]) -> Args {
        match parse(args).unwrap() {
            Command::Run(args) => args,
            other => panic!("expected Run, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let args = run_args(&[]);
        assert_eq!(args, Args::default());
        assert_eq!(args.workers, vec!["A", "B", "C"]);
        assert_eq!(args.pause, Duration::from_secs(1));
        assert_eq!(args.grace, None);
    }

    #[test]
    fn test_all_flags() {
        let args = run_args(&["-l", "/tmp/w.log", "-g", "5", "-p", "250", "-w", "x, y", "workers.jsonl"]);
        assert_eq!(args.log_file.as_deref(), Some("/tmp/w.log"));
        assert_eq!(args.grace, Some(Duration::from_secs(5)));
        assert_eq!(args.pause, Duration::from_millis(250));
        assert_eq!(args.workers, vec!["x", "y"]);
        assert_eq!(args.config_file.as_deref(), Some("workers.jsonl"));
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse(&["-h"]), Ok(Command::Help));
        assert_eq!(parse(&["-p", "10", "-v"]), Ok(Command::Version));
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse(&["-g", "abc"]).unwrap_err().contains("positive number"));
        assert!(parse(&["-p", "0"]).is_err());
        assert!(parse(&["-g"]).unwrap_err().contains("Missing"));
        assert!(parse(&["-l"]).is_err());
        assert!(parse(&["-w", "ok,bad name"]).is_err());
        assert!(parse(&["-w", "A,"]).is_err());
    }

    #[test]
    fn test_unexpected_arguments() {
        assert!(parse(&["-x"]).unwrap_err().contains("Unexpected argument: -x"));
        assert!(parse(&["a.jsonl", "b.jsonl"]).is_err());
    }

    #[test]
    fn test_worker_specs_from_flags() {
        let specs = run_args(&["-w", "P,Q", "-p", "20"]).worker_specs().unwrap();
        assert_eq!(
            specs,
            vec![
                WorkerSpec::new("P", Duration::from_millis(20)),
                WorkerSpec::new("Q", Duration::from_millis(20)),
            ]
        );
    }

    #[test]
    fn test_worker_specs_from_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("workers.jsonl");
        fs::write(&path, "{\"name\":\"only\",\"pause_ms\":5}\n").unwrap();

        let args = run_args(&["-w", "ignored", path.to_str().unwrap()]);
        let specs = args.worker_specs().unwrap();
        assert_eq!(specs, vec![WorkerSpec::new("only", Duration::from_millis(5))]);
    }
}
