// orchestrator: Drives one remote call at a time through
// optimistic update → pending → resolved → idle.
//
// Each controller owns a `RequestGate`. Entering the gate while another
// request is outstanding is refused; leaving it (by any path, including a
// dropped future) resets the published `PendingState` and stops the typing
// indicator.

pub mod chat;
pub mod scan;

pub use chat::{ChatController, SendOutcome};
pub use scan::{AnalysisStatus, ScanController, ScanOutcome, ScanResult};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::typing::TypingIndicator;

/// Assistant turn appended when the chat call fails.
pub const CHAT_FALLBACK_TEXT: &str = "⚠️ Bhai thoda error ho gaya, phir se try karo.";
/// Analysis stored when the vision call fails.
pub const VISION_FALLBACK_TEXT: &str = "❌ Failed to analyze image. Try again later.";
/// Used when either service answers without a usable result.
pub const NO_RESULT_TEXT: &str = "No result from AI.";

/// What the UI needs to show a request is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingState {
    pub in_flight: bool,
    /// 1..=3; drives the growing ellipsis.
    pub indicator_phase: u8,
}

impl PendingState {
    pub const IDLE: Self = Self {
        in_flight: false,
        indicator_phase: 1,
    };
}

impl Default for PendingState {
    fn default() -> Self {
        Self::IDLE
    }
}

pub struct RequestGate {
    busy: AtomicBool,
    state: Arc<watch::Sender<PendingState>>,
    typing_interval: Duration,
}

impl RequestGate {
    pub fn new(typing_interval: Duration) -> Self {
        let (state, _rx) = watch::channel(PendingState::IDLE);
        Self {
            busy: AtomicBool::new(false),
            state: Arc::new(state),
            typing_interval,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PendingState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PendingState {
        *self.state.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Claim the gate, or `None` if a request is already outstanding.
    /// The claim is held until the returned guard drops.
    pub fn try_reserve(&self) -> Option<PendingGuard<'_>> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(PendingGuard {
            gate: self,
            indicator: None,
        })
    }
}

/// Held for the lifetime of one request. Dropping it is the finalize step.
pub struct PendingGuard<'a> {
    gate: &'a RequestGate,
    indicator: Option<TypingIndicator>,
}

impl PendingGuard<'_> {
    /// Publish `in_flight = true`, optionally starting the typing indicator.
    pub fn begin(&mut self, with_indicator: bool) {
        self.gate.state.send_replace(PendingState {
            in_flight: true,
            indicator_phase: 1,
        });
        if with_indicator && self.indicator.is_none() {
            self.indicator = Some(TypingIndicator::start(
                Arc::clone(&self.gate.state),
                self.gate.typing_interval,
            ));
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut indicator) = self.indicator.take() {
            indicator.stop();
        }
        self.gate.state.send_replace(PendingState::IDLE);
        self.gate.busy.store(false, Ordering::SeqCst);
    }
}
