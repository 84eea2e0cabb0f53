//! Scanner controller
//!
//! Owns one scanner for the lifetime of a presentation session and turns its
//! attempt outcomes into session behavior: a success lingers for the dismiss
//! delay and then asks the host to close, a failure stays on screen until the
//! user retries or cancels.
//!
//! Each started attempt is watched on its own task under a child of the
//! session `CancellationToken`. `stop_scanning` and `refresh` cancel the
//! current child, taking a pending dismiss timer with it; `cancel` or dropping
//! the controller cancels the session and silences every watcher at once.

use crate::config::PalmConfig;
use crate::palm_scanner::{PalmScanner, ScannerConfig};
use crate::scan::{ScanAttempt, ScanError, Scanner, SessionEvent, SessionStats, StatsSnapshot};
use crate::state::{ScanMode, ScanState};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_DISMISS_DELAY: Duration = Duration::from_secs(3);
const EVENT_CAPACITY: usize = 64;

pub struct ScannerController<S: Scanner = PalmScanner> {
    scanner: S,
    enrollment_code: String,
    dismiss_delay: Duration,
    dismiss: Arc<watch::Sender<bool>>,
    events: broadcast::Sender<SessionEvent>,
    stats: SessionStats,
    last_error: Arc<Mutex<Option<ScanError>>>,
    session: CancellationToken,
    attempt: CancellationToken,
}

struct WatchContext {
    mode: ScanMode,
    dismiss_delay: Duration,
    state_rx: watch::Receiver<ScanState>,
    dismiss: Arc<watch::Sender<bool>>,
    events: broadcast::Sender<SessionEvent>,
    stats: SessionStats,
    last_error: Arc<Mutex<Option<ScanError>>>,
    cancel: CancellationToken,
}

impl ScannerController<PalmScanner> {
    pub fn from_config(config: &PalmConfig, mode: ScanMode) -> Self {
        ScannerController::new(config.build_scanner(mode))
            .with_dismiss_delay(config.dismiss_delay())
            .with_enrollment_code(config.enrollment.code_url.clone())
    }
}

impl<S: Scanner> ScannerController<S> {
    pub fn new(scanner: S) -> Self {
        let (dismiss, _) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let session = CancellationToken::new();
        let attempt = session.child_token();

        Self {
            scanner,
            enrollment_code: crate::config::EnrollmentConfig::default().code_url,
            dismiss_delay: DEFAULT_DISMISS_DELAY,
            dismiss: Arc::new(dismiss),
            events,
            stats: SessionStats::new(),
            last_error: Arc::new(Mutex::new(None)),
            session,
            attempt,
        }
    }

    pub fn with_dismiss_delay(mut self, delay: Duration) -> Self {
        self.dismiss_delay = delay;
        self
    }

    pub fn with_enrollment_code(mut self, code: impl Into<String>) -> Self {
        self.enrollment_code = code.into();
        self
    }

    pub fn scanner(&self) -> &S {
        &self.scanner
    }

    pub fn config(&self) -> &ScannerConfig {
        self.scanner.config()
    }

    pub fn mode(&self) -> ScanMode {
        self.scanner.config().mode
    }

    pub fn state(&self) -> ScanState {
        self.scanner.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ScanState> {
        self.scanner.subscribe()
    }

    pub fn should_dismiss(&self) -> bool {
        *self.dismiss.borrow()
    }

    pub fn dismissal(&self) -> watch::Receiver<bool> {
        self.dismiss.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn last_error(&self) -> Option<ScanError> {
        self.last_error.lock().unwrap().clone()
    }

    /// The enrollment code to render, only while the current state shows one.
    pub fn enrollment_code(&self) -> Option<&str> {
        if self.state().shows_enrollment_code() {
            Some(&self.enrollment_code)
        } else {
            None
        }
    }

    /// Returns false if an attempt was already in flight, the session already
    /// succeeded, or the session was cancelled.
    pub fn start_scanning(&mut self) -> bool {
        if self.session.is_cancelled() {
            debug!("start_scanning ignored: session cancelled");
            return false;
        }

        match self.scanner.start() {
            Some(attempt) => {
                self.watch_attempt(attempt);
                true
            }
            None => {
                debug!("start_scanning ignored in state {}", self.scanner.state());
                false
            }
        }
    }

    pub fn stop_scanning(&mut self) {
        self.attempt.cancel();
        self.scanner.stop();
        let _ = self.events.send(SessionEvent::Stopped);
    }

    /// User-initiated abandonment. The in-flight attempt is dropped without a
    /// state change, so a cancelled scan never surfaces as an error.
    pub fn cancel(&mut self) {
        info!("Session cancelled in state {}", self.scanner.state());
        self.scanner.abandon();
        self.session.cancel();
        self.dismiss.send_replace(true);
        let _ = self.events.send(SessionEvent::Cancelled);
    }

    pub fn refresh(&mut self) -> bool {
        if self.session.is_cancelled() {
            debug!("refresh ignored: session cancelled");
            return false;
        }

        self.attempt.cancel();
        self.scanner.reset();
        self.last_error.lock().unwrap().take();
        let _ = self.events.send(SessionEvent::Refreshed);
        self.start_scanning()
    }

    fn watch_attempt(&mut self, attempt: ScanAttempt) {
        self.attempt = self.session.child_token();

        self.stats.attempt_started();
        let _ = self.events.send(SessionEvent::Started {
            attempt_id: attempt.id(),
        });

        let ctx = WatchContext {
            mode: self.mode(),
            dismiss_delay: self.dismiss_delay,
            state_rx: self.scanner.subscribe(),
            dismiss: Arc::clone(&self.dismiss),
            events: self.events.clone(),
            stats: self.stats.clone(),
            last_error: Arc::clone(&self.last_error),
            cancel: self.attempt.clone(),
        };
        tokio::spawn(ctx.await_outcome(attempt));
    }
}

impl WatchContext {
    async fn await_outcome(self, attempt: ScanAttempt) {
        let attempt_id = attempt.id();
        let started = Instant::now();

        let outcome = tokio::select! {
            outcome = attempt.outcome() => outcome,
            _ = self.cancel.cancelled() => {
                debug!("Stopped watching attempt {}", attempt_id);
                self.stats.attempt_cancelled();
                return;
            }
        };

        match outcome {
            None => {
                debug!("Attempt {} was abandoned", attempt_id);
                self.stats.attempt_cancelled();
            }
            Some(Ok(())) => {
                self.stats.attempt_succeeded(started.elapsed());
                let state = self.state_rx.borrow().clone();
                info!(
                    "Attempt {} succeeded ({}), dismissing in {:?}",
                    attempt_id, state, self.dismiss_delay
                );
                let _ = self.events.send(SessionEvent::Succeeded { attempt_id, state });

                tokio::select! {
                    _ = tokio::time::sleep(self.dismiss_delay) => {
                        self.dismiss.send_replace(true);
                        let _ = self.events.send(SessionEvent::Dismissed);
                        debug!("Session dismissed after success");
                    }
                    _ = self.cancel.cancelled() => {
                        debug!("Dismiss timer for attempt {} cancelled", attempt_id);
                    }
                }
            }
            Some(Err(error)) => {
                self.stats.attempt_failed(started.elapsed());
                let state = ScanState::from_error(&error, self.mode);
                let committed = self.state_rx.borrow().clone();
                if committed != state {
                    warn!(
                        "Scanner reported {} for {}, expected {}",
                        committed, error, state
                    );
                }

                info!("Attempt {} failed: {}", attempt_id, error);
                *self.last_error.lock().unwrap() = Some(error.clone());
                let _ = self.events.send(SessionEvent::Failed {
                    attempt_id,
                    error,
                    state,
                });
            }
        }
    }
}

impl<S: Scanner> Drop for ScannerController<S> {
    fn drop(&mut self) {
        self.session.cancel();
    }
}
