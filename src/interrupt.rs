//! Sources of the interruption that starts a shutdown
//!
//! The coordinator only needs "block until the next interruption"; where it
//! comes from is up to the implementation of [`InterruptionSource`].

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::fmt;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};

/// What asked the process to stop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interruption {
    /// SIGINT (Ctrl+C)
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Requested from inside the process, or the source went away
    Requested,
}

impl Interruption {
    /// Encoding used by `StopSignal`; 0 is reserved for "none"
    pub(crate) fn code(self) -> u8 {
        match self {
            Interruption::Interrupt => 1,
            Interruption::Terminate => 2,
            Interruption::Requested => 3,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Interruption::Interrupt),
            2 => Some(Interruption::Terminate),
            3 => Some(Interruption::Requested),
            _ => None,
        }
    }

    fn from_signal(sig: i32) -> Self {
        match sig {
            SIGTERM => Interruption::Terminate,
            _ => Interruption::Interrupt,
        }
    }
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interruption::Interrupt => write!(f, "SIGINT"),
            Interruption::Terminate => write!(f, "SIGTERM"),
            Interruption::Requested => write!(f, "shutdown request"),
        }
    }
}

/// Blocking source of interruption events
pub trait InterruptionSource: Send {
    /// Blocks until the next interruption
    ///
    /// Returns `None` once the source can never deliver again.
    fn next_interruption(&mut self) -> Option<Interruption>;
}

/// SIGINT and SIGTERM delivered to this process
///
/// Registration replaces the default handlers, so create it before any
/// worker starts: from then on a signal is queued instead of killing the
/// process.
pub struct OsSignals {
    signals: Signals,
}

impl OsSignals {
    /// Registers handlers for SIGINT and SIGTERM
    ///
    /// # Errors
    /// If the handlers cannot be installed
    pub fn new() -> io::Result<Self> {
        let signals = Signals::new([SIGINT, SIGTERM])?;
        Ok(Self { signals })
    }
}

impl InterruptionSource for OsSignals {
    fn next_interruption(&mut self) -> Option<Interruption> {
        self.signals.forever().next().map(Interruption::from_signal)
    }
}

/// Sending half of [`channel`]
#[derive(Clone, Debug)]
pub struct Interrupter {
    tx: Sender<Interruption>,
}

impl Interrupter {
    /// Delivers an interruption
    ///
    /// # Returns
    /// `false` if the receiving source is gone
    pub fn interrupt(&self, cause: Interruption) -> bool {
        self.tx.send(cause).is_ok()
    }
}

/// Receiving half of [`channel`]
pub struct ChannelSource {
    rx: Receiver<Interruption>,
}

impl InterruptionSource for ChannelSource {
    fn next_interruption(&mut self) -> Option<Interruption> {
        self.rx.recv().ok()
    }
}

/// Creates an in-process interruption source and its trigger
///
/// The source closes when every `Interrupter` has been dropped.
pub fn channel() -> (Interrupter, ChannelSource) {
    let (tx, rx) = mpsc::channel();
    (Interrupter { tx }, ChannelSource { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_code_round_trip() {
        for cause in [
            Interruption::Interrupt,
            Interruption::Terminate,
            Interruption::Requested,
        ] {
            assert_eq!(Interruption::from_code(cause.code()), Some(cause));
        }
        assert_eq!(Interruption::from_code(0), None);
    }

    #[test]
    fn test_signal_mapping() {
        assert_eq!(Interruption::from_signal(SIGINT), Interruption::Interrupt);
        assert_eq!(Interruption::from_signal(SIGTERM), Interruption::Terminate);
    }

    #[test]
    fn test_channel_delivers_in_order_then_closes() {
        let (interrupter, mut source) = channel();
        assert!(interrupter.interrupt(Interruption::Terminate));
        assert!(interrupter.interrupt(Interruption::Interrupt));
        drop(interrupter);

        assert_eq!(source.next_interruption(), Some(Interruption::Terminate));
        assert_eq!(source.next_interruption(), Some(Interruption::Interrupt));
        assert_eq!(source.next_interruption(), None);
    }

    #[test]
    fn test_interrupt_after_source_dropped() {
        let (interrupter, source) = channel();
        drop(source);
        assert!(!interrupter.interrupt(Interruption::Requested));
    }

    #[test]
    #[serial]
    fn test_os_signals_receives_raised_sigterm() {
        let mut signals = OsSignals::new().unwrap();
        signal_hook::low_level::raise(SIGTERM).unwrap();
        assert_eq!(signals.next_interruption(), Some(Interruption::Terminate));
    }
}
