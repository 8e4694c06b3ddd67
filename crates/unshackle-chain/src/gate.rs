//! Single-slot input gate and the dispatcher that feeds it.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

use unshackle_types::{Result, UnshackleError};

use crate::console::Console;
use crate::events::{ChainEvent, EventEmitter};
use crate::input::InputSource;

struct Armed {
    accepted: Vec<String>,
    resolve: oneshot::Sender<String>,
}

/// What happened to one chunk of normalized input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offer {
    /// Matched an accepted choice; the waiting prompt was resolved.
    Accepted(String),
    /// Did not match; the gate stays armed with these choices.
    Rejected { choices: Vec<String> },
    /// No prompt was waiting.
    Idle,
}

/// Holds at most one waiting prompt and the inputs it accepts.
pub struct InputGate {
    slot: Mutex<Option<Armed>>,
}

impl InputGate {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Arm the gate. The returned receiver resolves with the accepted input.
    pub fn arm(&self, accepted: Vec<String>) -> Result<oneshot::Receiver<String>> {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|armed| !armed.resolve.is_closed()) {
            return Err(UnshackleError::GateBusy);
        }
        let (resolve, answer) = oneshot::channel();
        tracing::debug!(?accepted, "Input gate armed");
        *slot = Some(Armed { accepted, resolve });
        Ok(answer)
    }

    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    /// Test `input` against the accepted set, resolving and disarming on a match.
    pub fn offer(&self, input: &str) -> Offer {
        let mut slot = self.lock();
        let Some(armed) = slot.as_ref() else {
            return Offer::Idle;
        };
        if !armed.accepted.iter().any(|choice| choice == input) {
            return Offer::Rejected {
                choices: armed.accepted.clone(),
            };
        }
        if let Some(armed) = slot.take() {
            if armed.resolve.send(input.to_string()).is_err() {
                tracing::debug!(input, "Prompt went away before its answer arrived");
            }
        }
        Offer::Accepted(input.to_string())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Armed>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InputGate {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// InputDispatcher
// ---------------------------------------------------------------------------

/// Normalizes raw operator input and routes it to the gate.
pub struct InputDispatcher {
    gate: Arc<InputGate>,
    console: Arc<dyn Console>,
    events: EventEmitter,
}

impl InputDispatcher {
    pub fn new(gate: Arc<InputGate>, console: Arc<dyn Console>, events: EventEmitter) -> Self {
        Self {
            gate,
            console,
            events,
        }
    }

    pub fn dispatch(&self, raw: &str) -> Offer {
        let input = raw.trim();
        let offer = self.gate.offer(input);
        match offer {
            Offer::Accepted(ref input) => {
                self.events.emit(ChainEvent::PromptResolved {
                    input: input.clone(),
                });
            }
            Offer::Rejected { ref choices } => {
                self.console.out(&format!(
                    "Choose from [{}] to continue, or Ctrl+C to force-quit.",
                    choices.join(", ")
                ));
                self.events.emit(ChainEvent::PromptRejected {
                    input: input.to_string(),
                    choices: choices.clone(),
                });
            }
            Offer::Idle => {
                tracing::debug!(input, "Dropping input, no prompt is waiting");
                self.events.emit(ChainEvent::InputDropped {
                    input: input.to_string(),
                });
            }
        }
        offer
    }

    /// Dispatch every chunk from `source` until it closes.
    pub async fn listen(self, mut source: Box<dyn InputSource>) {
        tracing::debug!("Input dispatcher listening");
        while let Some(chunk) = source.next_chunk().await {
            self.dispatch(&chunk);
        }
        if self.gate.is_armed() {
            tracing::warn!("Operator input closed while a prompt is waiting; interrupt to quit");
        } else {
            tracing::debug!("Operator input closed");
        }
    }
}
