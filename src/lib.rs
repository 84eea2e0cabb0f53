//! Palm scan flow
//!
//! Drives palm enrollment and verification sessions without any UI attached.
//! A scanner engine owns the session state machine and resolves each attempt
//! asynchronously; a controller owns the engine, reacts to outcomes and tells
//! the host when to close the session.
//!
//! Register and verify sessions share one state space but reach different
//! parts of it. Presentation attributes are derived from the state, so a host
//! renders whatever `ScanState` it reads and never tracks flags of its own.

pub mod config;
pub mod controller;
pub mod outcome;
pub mod palm_scanner;
pub mod scan;
pub mod state;

pub use config::PalmConfig;
pub use controller::ScannerController;
pub use outcome::{
    FixedIdentity, IdentityResolver, OutcomeSource, PlaceholderIdentity, RandomOutcomes,
    ScriptedOutcomes, Subject,
};
pub use palm_scanner::{ColorToken, PalmScanner, ScannerConfig};
pub use scan::{ScanAttempt, ScanError, Scanner, SessionEvent};
pub use state::{ColorClass, Icon, ScanMode, ScanState};
