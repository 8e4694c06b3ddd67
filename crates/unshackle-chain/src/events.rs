//! Chain event system for observability.
//!
//! Emits [`ChainEvent`]s via a [`tokio::sync::broadcast`] channel so that
//! observers (tests, embedding UIs, audit logs) can follow a release as it
//! runs without coupling to the engine internals.

use serde::{Deserialize, Serialize};

use unshackle_types::StepKind;

/// Events emitted while a chain runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainEvent {
    ChainStarted {
        resume_from: Option<String>,
    },
    StepSkipped {
        mark: Option<String>,
        kind: StepKind,
    },
    StepStarted {
        mark: Option<String>,
        kind: StepKind,
    },
    StepCompleted {
        mark: Option<String>,
        kind: StepKind,
    },
    StepFailed {
        mark: Option<String>,
        kind: StepKind,
        error: String,
    },
    CommandFinished {
        command: String,
        exit_code: Option<i32>,
        duration_ms: u64,
    },
    PromptArmed {
        message: String,
        choices: Vec<String>,
    },
    PromptRejected {
        input: String,
        choices: Vec<String>,
    },
    PromptResolved {
        input: String,
    },
    InputDropped {
        input: String,
    },
    ChainHalted {
        code: i32,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<ChainEvent>,
}

impl EventEmitter {
    /// Create a new emitter with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// If there are no active receivers the event is silently dropped.
    pub fn emit(&self, event: ChainEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
