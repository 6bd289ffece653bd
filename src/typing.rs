// typing.rs: The "soch raha hai..." ellipsis shown while a reply is pending.
//
// A tokio task ticks the indicator phase 1 → 2 → 3 → 1 on a fixed period.
// The task lives exactly as long as its `TypingIndicator` handle.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::orchestrator::PendingState;

pub const DEFAULT_INTERVAL_MS: u64 = 400;
pub const MAX_PHASE: u8 = 3;
/// Shortest tick period; tokio intervals reject zero.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Next phase in the 1..=3 cycle.
pub fn next_phase(phase: u8) -> u8 {
    if phase >= MAX_PHASE {
        1
    } else {
        phase + 1
    }
}

/// Dots to render for `phase`.
pub fn ellipsis(phase: u8) -> &'static str {
    match phase {
        0 | 1 => ".",
        2 => "..",
        _ => "...",
    }
}

/// Handle to the running ticker. Dropping it stops the task.
pub struct TypingIndicator {
    handle: Option<JoinHandle<()>>,
}

impl TypingIndicator {
    /// Spawn the ticker. Must be called from within a tokio runtime.
    ///
    /// The phase only advances while `in_flight` is set, so a tick racing the
    /// final reset cannot move an idle indicator.
    /// A zero `interval` is raised to [`MIN_INTERVAL`].
    pub fn start(state: Arc<watch::Sender<PendingState>>, interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                state.send_if_modified(|s| {
                    if !s.in_flight {
                        return false;
                    }
                    s.indicator_phase = next_phase(s.indicator_phase);
                    true
                });
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TypingIndicator {
    fn drop(&mut self) {
        self.stop();
    }
}
