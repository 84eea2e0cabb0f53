//! Attempt outcomes
//!
//! The engine does not know how a scan succeeds or fails. An `OutcomeSource`
//! answers that for each attempt, and on a verify success an `IdentityResolver`
//! names the matched subject. The simulated sources stand in for sensor and
//! matcher hardware; scripted ones make sessions deterministic.

use crate::scan::errors::{ScanError, ScanResult};
use crate::state::ScanMode;
use chrono::{DateTime, Local};
use rand::{rngs::StdRng, seq::IndexedRandom, Rng, SeedableRng};
use std::collections::VecDeque;
use tracing::{debug, warn};

pub trait OutcomeSource: Send {
    fn next_outcome(&mut self, mode: ScanMode) -> ScanResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub name: String,
    pub matched_at: DateTime<Local>,
}

pub trait IdentityResolver: Send {
    fn resolve(&mut self) -> ScanResult<Subject>;
}

const REGISTER_FAILURES: [fn() -> ScanError; 3] = [
    ScanError::network,
    ScanError::device_not_activated,
    ScanError::device_not_initialized,
];

const VERIFY_FAILURES: [fn() -> ScanError; 4] = [
    ScanError::not_enrolled,
    ScanError::network,
    ScanError::device_not_activated,
    ScanError::device_not_initialized,
];

const DEFAULT_SUCCESS_PROBABILITY: f64 = 0.5;

/// Coin-flip simulator: half the attempts succeed, failures pick a cause
/// uniformly from the mode's failure set.
#[derive(Debug)]
pub struct RandomOutcomes {
    rng: StdRng,
    success_probability: f64,
}

impl Default for RandomOutcomes {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomOutcomes {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            success_probability: DEFAULT_SUCCESS_PROBABILITY,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            success_probability: DEFAULT_SUCCESS_PROBABILITY,
        }
    }

    /// Clamped to `0.0..=1.0`; NaN falls back to an even split.
    pub fn with_success_probability(mut self, probability: f64) -> Self {
        self.success_probability = if probability.is_nan() {
            warn!("Ignoring NaN success probability");
            DEFAULT_SUCCESS_PROBABILITY
        } else {
            probability.clamp(0.0, 1.0)
        };
        self
    }
}

impl OutcomeSource for RandomOutcomes {
    fn next_outcome(&mut self, mode: ScanMode) -> ScanResult<()> {
        if self.rng.random_bool(self.success_probability) {
            return Ok(());
        }

        let failures: &[fn() -> ScanError] = match mode {
            ScanMode::Register => &REGISTER_FAILURES,
            ScanMode::Verify => &VERIFY_FAILURES,
        };
        let error = failures
            .choose(&mut self.rng)
            .map(|make| make())
            .unwrap_or_else(ScanError::network);
        debug!("Simulated {} failure: {}", mode.as_str(), error);
        Err(error)
    }
}

/// Replays a fixed sequence of outcomes, then keeps returning the fallback.
#[derive(Debug, Clone)]
pub struct ScriptedOutcomes {
    script: VecDeque<ScanResult<()>>,
    fallback: ScanResult<()>,
}

impl ScriptedOutcomes {
    pub fn new(script: impl IntoIterator<Item = ScanResult<()>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: Ok(()),
        }
    }

    pub fn always(outcome: ScanResult<()>) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: outcome,
        }
    }

    pub fn then_always(mut self, outcome: ScanResult<()>) -> Self {
        self.fallback = outcome;
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl OutcomeSource for ScriptedOutcomes {
    fn next_outcome(&mut self, _mode: ScanMode) -> ScanResult<()> {
        self.script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Reports the same configured name for every match, stamped with the current
/// time. Used until a real matcher supplies identities.
#[derive(Debug, Clone)]
pub struct PlaceholderIdentity {
    name: String,
}

impl PlaceholderIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl IdentityResolver for PlaceholderIdentity {
    fn resolve(&mut self) -> ScanResult<Subject> {
        Ok(Subject {
            name: self.name.clone(),
            matched_at: Local::now(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FixedIdentity {
    subject: ScanResult<Subject>,
}

impl FixedIdentity {
    pub fn new(name: impl Into<String>, matched_at: DateTime<Local>) -> Self {
        Self {
            subject: Ok(Subject {
                name: name.into(),
                matched_at,
            }),
        }
    }

    pub fn failing(error: ScanError) -> Self {
        Self { subject: Err(error) }
    }
}

impl IdentityResolver for FixedIdentity {
    fn resolve(&mut self) -> ScanResult<Subject> {
        self.subject.clone()
    }
}
