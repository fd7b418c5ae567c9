//! Interrupt handling (SIGINT/SIGTERM).
//!
//! The first signal sets the shared [`CancelToken`]: the dispatcher stops
//! starting new files and reports the rest as cancelled, while files already
//! being rewritten finish their atomic write. A second signal exits at once
//! with [`EXIT_CODE_CANCELLED`].

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Exit code for cancelled runs
pub const EXIT_CODE_CANCELLED: i32 = 80;

/// Shared cancellation flag, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: stop scheduling new work
    Cancel,
    /// Second signal: exit immediately
    ImmediateExit,
    /// Third+ signal: ignore
    Ignore,
}

/// Counts received signals and drives the token.
#[derive(Debug, Default)]
pub struct SignalState {
    token: CancelToken,
    signal_count: AtomicU8,
}

impl SignalState {
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            signal_count: AtomicU8::new(0),
        }
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Record one signal and decide what to do about it.
    pub fn handle_signal(&self) -> SignalAction {
        match self.signal_count.fetch_add(1, Ordering::SeqCst) {
            0 => {
                self.token.cancel();
                SignalAction::Cancel
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }
}

/// Install the process-wide handler. Must be called at most once.
pub fn install(token: CancelToken) -> Result<(), ctrlc::Error> {
    let state = Arc::new(SignalState::new(token));
    ctrlc::set_handler(move || match state.handle_signal() {
        SignalAction::Cancel => {
            tracing::warn!("interrupt received, finishing files in progress");
        }
        SignalAction::ImmediateExit => {
            tracing::warn!("second interrupt received, exiting");
            std::process::exit(EXIT_CODE_CANCELLED);
        }
        SignalAction::Ignore => {}
    })
}
