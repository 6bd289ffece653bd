// chat.rs: Text chat. Append the user's turn, ask the service, append the
// reply (or a fixed fallback).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use super::{PendingState, RequestGate, CHAT_FALLBACK_TEXT, NO_RESULT_TEXT};
use crate::ai::ChatBackend;
use crate::session::{SessionModel, Turn};

/// How a `send` resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// Another request is still pending; nothing happened.
    Busy,
    /// The service replied; the turn was appended.
    Replied(Turn),
    /// The service answered without a usable result; a placeholder turn was appended.
    EmptyReply(Turn),
    /// The call failed; the fallback turn was appended.
    Failed(Turn),
}

impl SendOutcome {
    /// The assistant turn this send appended, if any.
    pub fn turn(&self) -> Option<&Turn> {
        match self {
            Self::Replied(t) | Self::EmptyReply(t) | Self::Failed(t) => Some(t),
            Self::Ignored | Self::Busy => None,
        }
    }
}

pub struct ChatController {
    session: Mutex<SessionModel>,
    backend: Arc<dyn ChatBackend>,
    gate: RequestGate,
}

impl ChatController {
    pub fn new(
        session: SessionModel,
        backend: Arc<dyn ChatBackend>,
        typing_interval: Duration,
    ) -> Self {
        log::info!(
            "ChatController: using {} ({} turns restored)",
            backend.name(),
            session.len()
        );
        Self {
            session: Mutex::new(session),
            backend,
            gate: RequestGate::new(typing_interval),
        }
    }

    fn session(&self) -> MutexGuard<'_, SessionModel> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the transcript.
    pub fn turns(&self) -> Vec<Turn> {
        self.session().turns().to_vec()
    }

    pub fn len(&self) -> usize {
        self.session().len()
    }

    pub fn is_empty(&self) -> bool {
        self.session().is_empty()
    }

    pub fn pending(&self) -> PendingState {
        self.gate.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<PendingState> {
        self.gate.subscribe()
    }

    /// Wipe the transcript. Refused (returns false) while a reply is pending.
    pub fn clear(&self) -> bool {
        let Some(_guard) = self.gate.try_reserve() else {
            return false;
        };
        self.session().clear();
        log::info!("ChatController: session cleared");
        true
    }

    /// Send `text` and wait for the assistant's turn.
    ///
    /// The user turn is appended and persisted before the remote call; the
    /// remote call receives the whole transcript. Once the call resolves,
    /// successfully or not, exactly one assistant turn follows the user turn.
    /// If this future is dropped mid-call, the user turn stays without a
    /// reply. The pending state is reset in every case, including the drop.
    pub async fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }
        let Some(mut guard) = self.gate.try_reserve() else {
            log::warn!("ChatController: send rejected, a reply is still pending");
            return SendOutcome::Busy;
        };

        let context = {
            let mut session = self.session();
            session.append(Turn::user(text));
            session.turns().to_vec()
        };

        guard.begin(true);
        log::info!("ChatController: sending {} turns", context.len());

        let outcome = match self.backend.chat(&context).await {
            Ok(Some(reply)) => SendOutcome::Replied(Turn::assistant(reply)),
            Ok(None) => {
                log::warn!("ChatController: reply had no usable result");
                SendOutcome::EmptyReply(Turn::assistant(NO_RESULT_TEXT))
            }
            Err(e) => {
                log::error!("ChatController: chat request failed: {}", e);
                SendOutcome::Failed(Turn::assistant(CHAT_FALLBACK_TEXT))
            }
        };

        if let Some(turn) = outcome.turn() {
            self.session().append(turn.clone());
        }
        drop(guard);
        outcome
    }
}
