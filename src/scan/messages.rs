//! Scan messages
//!
//! Typed messages for attempt completion and session progress instead of
//! callbacks. An attempt's outcome travels over a oneshot channel: the engine
//! consumes its `Completion` to resolve, so a second resolution cannot be
//! expressed.

use super::errors::{ScanError, ScanResult};
use crate::state::ScanState;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Creates the two halves of a single attempt's completion channel.
pub fn attempt_channel() -> (Completion, ScanAttempt) {
    let id = Uuid::new_v4();
    let (tx, rx) = oneshot::channel();
    (Completion { attempt_id: id, tx }, ScanAttempt { id, rx })
}

/// Resolving half, held by whoever performs the scan.
#[derive(Debug)]
pub struct Completion {
    attempt_id: Uuid,
    tx: oneshot::Sender<ScanResult<()>>,
}

impl Completion {
    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    /// Returns false when nobody is waiting on the attempt anymore.
    pub fn complete(self, result: ScanResult<()>) -> bool {
        self.tx.send(result).is_ok()
    }
}

/// Awaiting half, handed to the caller of `Scanner::start`.
#[derive(Debug)]
pub struct ScanAttempt {
    id: Uuid,
    rx: oneshot::Receiver<ScanResult<()>>,
}

impl ScanAttempt {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// `None` means the attempt was cancelled before it resolved.
    pub async fn outcome(self) -> Option<ScanResult<()>> {
        self.rx.await.ok()
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started {
        attempt_id: Uuid,
    },
    Succeeded {
        attempt_id: Uuid,
        state: ScanState,
    },
    Failed {
        attempt_id: Uuid,
        error: ScanError,
        state: ScanState,
    },
    Stopped,
    Refreshed,
    Cancelled,
    Dismissed,
}

impl SessionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEvent::Started { .. } => "started",
            SessionEvent::Succeeded { .. } => "succeeded",
            SessionEvent::Failed { .. } => "failed",
            SessionEvent::Stopped => "stopped",
            SessionEvent::Refreshed => "refreshed",
            SessionEvent::Cancelled => "cancelled",
            SessionEvent::Dismissed => "dismissed",
        }
    }
}
