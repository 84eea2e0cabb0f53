//! Scanner capability
//!
//! Anything that can drive a palm scan session implements `Scanner`: the
//! simulated `PalmScanner`, a real sensor binding, or a test double. Completion
//! is reported through the `ScanAttempt` returned by `start`, never through a
//! callback, so the owner decides where and when results are handled.
//!
//! Implementations own their state exclusively. Observers read it through
//! `state()` or a watch subscription and never see a half-applied transition.

pub mod errors;
pub mod messages;
pub mod stats;

pub use errors::{ScanError, ScanErrorKind, ScanResult};
pub use messages::{attempt_channel, Completion, ScanAttempt, SessionEvent};
pub use stats::{SessionStats, StatsSnapshot};

use crate::palm_scanner::ScannerConfig;
use crate::state::ScanState;
use tokio::sync::watch;

pub trait Scanner: Send {
    fn state(&self) -> ScanState;

    fn config(&self) -> &ScannerConfig;

    fn subscribe(&self) -> watch::Receiver<ScanState>;

    /// Moves to `Scanning` and begins an attempt.
    ///
    /// Returns `None` while an attempt is already in flight; the running
    /// attempt is left untouched.
    fn start(&mut self) -> Option<ScanAttempt>;

    /// Abandons any in-flight attempt and returns to the mode's idle state.
    /// The abandoned attempt never resolves.
    fn stop(&mut self);

    /// Drops the in-flight attempt without touching the state. The abandoned
    /// attempt never resolves and nothing it would have reported is committed.
    fn abandon(&mut self);

    fn reset(&mut self) {
        self.stop();
    }
}
