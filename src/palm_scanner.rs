//! Palm scanner
//!
//! The engine behind a palm scan session. Each `start` spawns one attempt task
//! that waits out the sensor latency, asks the outcome source how the scan went
//! and commits the resulting state before resolving the attempt.
//!
//! Every start bumps a generation counter. A resolving task commits only if its
//! generation is still current and the session is still scanning; the check,
//! the state write and the completion happen under one lock, so `stop` either
//! lands before the resolution or after it, never in between.

use crate::outcome::{IdentityResolver, OutcomeSource, PlaceholderIdentity, RandomOutcomes};
use crate::scan::{attempt_channel, Completion, ScanAttempt, ScanResult, Scanner};
use crate::state::{ColorClass, ScanMode, ScanState};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_SCAN_LATENCY: Duration = Duration::from_millis(1500);
pub const DEFAULT_PLACEHOLDER_NAME: &str = "XiJie Yuan";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorToken {
    pub class: ColorClass,

    pub opacity: f32,
}

impl Default for ColorToken {
    fn default() -> Self {
        Self {
            class: ColorClass::Success,
            opacity: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    pub mode: ScanMode,

    pub scan_area_size: f32,

    pub scan_area_color: ColorToken,
}

impl ScannerConfig {
    pub fn new(mode: ScanMode, scan_area_size: f32, scan_area_color: ColorToken) -> Self {
        Self {
            mode,
            scan_area_size,
            scan_area_color,
        }
    }

    pub fn for_mode(mode: ScanMode) -> Self {
        Self::new(mode, 200.0, ColorToken::default())
    }
}

struct Collaborators {
    outcomes: Box<dyn OutcomeSource>,
    identity: Box<dyn IdentityResolver>,
}

struct Shared {
    generation: Mutex<u64>,
    state: watch::Sender<ScanState>,
}

impl Shared {
    fn commit(
        &self,
        generation: u64,
        next: ScanState,
        completion: Completion,
        result: ScanResult<()>,
    ) -> bool {
        let current = self.generation.lock().unwrap();
        let scanning = self.state.borrow().is_scanning();
        if *current != generation || !scanning {
            return false;
        }

        self.state.send_replace(next);
        if !completion.complete(result) {
            debug!("Attempt resolved with nobody listening");
        }
        true
    }
}

struct AttemptContext {
    mode: ScanMode,
    generation: u64,
    latency: Duration,
    shared: Arc<Shared>,
    collaborators: Arc<Mutex<Collaborators>>,
    cancel: CancellationToken,
}

impl AttemptContext {
    fn resolve(&self) -> (ScanState, ScanResult<()>) {
        let mut collaborators = self.collaborators.lock().unwrap();

        let outcome = collaborators.outcomes.next_outcome(self.mode).and_then(|()| {
            match self.mode {
                ScanMode::Register => Ok(ScanState::RegistrationSuccess),
                ScanMode::Verify => {
                    collaborators
                        .identity
                        .resolve()
                        .map(|subject| ScanState::VerificationSuccess {
                            subject_name: subject.name,
                            timestamp: subject.matched_at,
                        })
                }
            }
        });

        match outcome {
            Ok(state) => (state, Ok(())),
            Err(error) => (ScanState::from_error(&error, self.mode), Err(error)),
        }
    }
}

pub struct PalmScanner {
    config: ScannerConfig,
    latency: Duration,
    shared: Arc<Shared>,
    collaborators: Arc<Mutex<Collaborators>>,
    in_flight: Option<CancellationToken>,
}

impl std::fmt::Debug for PalmScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PalmScanner")
            .field("config", &self.config)
            .field("latency", &self.latency)
            .field("state", &*self.shared.state.borrow())
            .finish_non_exhaustive()
    }
}

impl PalmScanner {
    /// Simulated scanner: random outcomes and a placeholder identity.
    pub fn new(config: ScannerConfig) -> Self {
        let (state, _) = watch::channel(config.mode.idle_state());

        Self {
            config,
            latency: DEFAULT_SCAN_LATENCY,
            shared: Arc::new(Shared {
                generation: Mutex::new(0),
                state,
            }),
            collaborators: Arc::new(Mutex::new(Collaborators {
                outcomes: Box::new(RandomOutcomes::new()),
                identity: Box::new(PlaceholderIdentity::new(DEFAULT_PLACEHOLDER_NAME)),
            })),
            in_flight: None,
        }
    }

    pub fn with_mode(mode: ScanMode) -> Self {
        Self::new(ScannerConfig::for_mode(mode))
    }

    pub fn with_outcomes(self, outcomes: impl OutcomeSource + 'static) -> Self {
        self.collaborators.lock().unwrap().outcomes = Box::new(outcomes);
        self
    }

    pub fn with_identity(self, identity: impl IdentityResolver + 'static) -> Self {
        self.collaborators.lock().unwrap().identity = Box::new(identity);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    async fn run_attempt(ctx: AttemptContext, completion: Completion) {
        let attempt_id = completion.attempt_id();

        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                debug!("Attempt {} cancelled before resolution", attempt_id);
            }
            _ = tokio::time::sleep(ctx.latency) => {
                let (next, result) = ctx.resolve();
                let state_name = next.name();

                if ctx.shared.commit(ctx.generation, next, completion, result) {
                    info!("Attempt {} resolved to {}", attempt_id, state_name);
                } else {
                    warn!("Discarding stale resolution of attempt {}", attempt_id);
                }
            }
        }
    }
}

impl Scanner for PalmScanner {
    fn state(&self) -> ScanState {
        self.shared.state.borrow().clone()
    }

    fn config(&self) -> &ScannerConfig {
        &self.config
    }

    fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.shared.state.subscribe()
    }

    /// Must be called from within a Tokio runtime.
    ///
    /// A success state is terminal for the session; `reset` first to scan again.
    fn start(&mut self) -> Option<ScanAttempt> {
        let generation = {
            let mut generation = self.shared.generation.lock().unwrap();
            let current = self.shared.state.borrow().clone();
            if current.is_scanning() {
                debug!("Scan already in progress, ignoring start");
                return None;
            }
            if current.is_success() {
                debug!("Session already succeeded ({}), ignoring start", current);
                return None;
            }
            *generation += 1;
            self.shared.state.send_replace(ScanState::Scanning);
            *generation
        };

        let (completion, attempt) = attempt_channel();
        let cancel = CancellationToken::new();
        if let Some(previous) = self.in_flight.replace(cancel.clone()) {
            previous.cancel();
        }

        info!(
            "Starting {} attempt {} (generation {})",
            self.config.mode.as_str(),
            attempt.id(),
            generation
        );

        let ctx = AttemptContext {
            mode: self.config.mode,
            generation,
            latency: self.latency,
            shared: Arc::clone(&self.shared),
            collaborators: Arc::clone(&self.collaborators),
            cancel,
        };
        tokio::spawn(Self::run_attempt(ctx, completion));

        Some(attempt)
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.in_flight.take() {
            cancel.cancel();
        }

        let idle = self.config.mode.idle_state();
        let mut generation = self.shared.generation.lock().unwrap();
        *generation += 1;
        let previous = self.shared.state.send_replace(idle);
        drop(generation);
        debug!(
            "Scanner stopped: {} -> {}",
            previous,
            self.config.mode.idle_state()
        );
    }

    fn abandon(&mut self) {
        if let Some(cancel) = self.in_flight.take() {
            cancel.cancel();
        }

        let mut generation = self.shared.generation.lock().unwrap();
        *generation += 1;
        debug!(
            "Scanner abandoned its attempt in state {}",
            *self.shared.state.borrow()
        );
    }
}

impl Drop for PalmScanner {
    fn drop(&mut self) {
        if let Some(cancel) = self.in_flight.take() {
            cancel.cancel();
        }
    }
}
