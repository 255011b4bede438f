#[cfg(test)]
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Destination of the `started`/`finished` markers of a unit of work
pub trait MarkerSink: Send + Sync {
    /// Writes one marker line
    fn emit(&self, line: &str) -> io::Result<()>;
}

/// Writes markers to stdout, one line per marker
///
/// The stdout lock is held for the whole line so concurrent workers can
/// interleave lines but never tear one.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl MarkerSink for StdoutSink {
    fn emit(&self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }
}

/// Keeps markers in memory in emission order
#[derive(Debug, Default)]
pub struct Recorder {
    lines: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line recorded so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MarkerSink for Recorder {
    fn emit(&self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
        Ok(())
    }
}

/// Per-worker summary of a marker stream
#[cfg(test)]
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct PairAudit {
    /// `started` lines followed by their matching `finished`
    pub completed: usize,
    /// A trailing `started` with no `finished`
    pub dangling: bool,
    /// Lines that broke the started/finished alternation
    pub out_of_order: usize,
}

/// Groups marker lines by worker and checks the started/finished alternation
///
/// Lines that are not `<name> started` or `<name> finished` are ignored.
#[cfg(test)]
pub(crate) fn audit<S: AsRef<str>>(lines: &[S]) -> BTreeMap<String, PairAudit> {
    let mut audits: BTreeMap<String, PairAudit> = BTreeMap::new();
    for line in lines {
        let (name, started) = match line.as_ref().rsplit_once(' ') {
            Some((name, "started")) => (name, true),
            Some((name, "finished")) => (name, false),
            _ => continue,
        };
        let entry = audits.entry(name.to_string()).or_default();
        if started {
            if entry.dangling {
                entry.out_of_order += 1;
            }
            entry.dangling = true;
        } else if entry.dangling {
            entry.completed += 1;
            entry.dangling = false;
        } else {
            entry.out_of_order += 1;
        }
    }
    audits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_keeps_order() {
        let recorder = Recorder::new();
        recorder.emit("A started").unwrap();
        recorder.emit("B started").unwrap();
        recorder.emit("A finished").unwrap();
        assert_eq!(recorder.lines(), vec!["A started", "B started", "A finished"]);
    }

    #[test]
    fn test_audit_interleaved_workers() {
        let lines = [
            "A started",
            "B started",
            "A finished",
            "B finished",
            "A started",
            "A finished",
            "B started",
        ];
        let audits = audit(&lines);

        assert_eq!(
            audits["A"],
            PairAudit {
                completed: 2,
                dangling: false,
                out_of_order: 0
            }
        );
        assert_eq!(
            audits["B"],
            PairAudit {
                completed: 1,
                dangling: true,
                out_of_order: 0
            }
        );
    }

    #[test]
    fn test_audit_flags_broken_alternation() {
        let audits = audit(&["A finished", "A started", "A started", "A finished"]);
        assert_eq!(audits["A"].completed, 1);
        assert_eq!(audits["A"].out_of_order, 2);
        assert!(!audits["A"].dangling);
    }

    #[test]
    fn test_audit_ignores_foreign_lines() {
        let audits = audit(&["garbage", "B restarted", "A started", "A finished"]);
        assert_eq!(audits.len(), 1);
        assert_eq!(audits["A"].completed, 1);
    }

    #[test]
    fn test_stdout_sink_writes() {
        StdoutSink.emit("Z started").unwrap();
    }
}
