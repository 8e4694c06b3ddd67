//! Shared types and errors for the Unshackle release-chain engine.
//!
//! This crate provides the foundational types used across the other Unshackle crates:
//! - `UnshackleError`: unified error taxonomy
//! - `StepValue`: the value handed from one step to the next
//! - `StepKind`: what a step does, for logging and events

use serde::{Deserialize, Serialize};

/// Status code a chain halts with on success.
pub const EXIT_SUCCESS: i32 = 0;

/// Status code a chain halts with on any failure.
pub const EXIT_FAILURE: i32 = 1;

/// Unified error type for all Unshackle subsystems.
#[derive(Debug, thiserror::Error)]
pub enum UnshackleError {
    // === Lifecycle Errors ===
    #[error("The start method should only be called once.")]
    AlreadyStarted,

    // === Command Errors ===
    #[error("Command `{command}` exited with {}", describe_exit(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
    },

    #[error("Failed to spawn `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // === Chain Errors ===
    #[error("{0}")]
    StepFailed(String),

    #[error("A prompt is already waiting for input")]
    GateBusy,

    #[error("Operator input closed before the prompt was answered")]
    InputClosed,

    // === Script Errors ===
    #[error("Invalid release script: {0}")]
    Script(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl UnshackleError {
    /// Shorthand for a failure raised by a function step.
    pub fn step(message: impl Into<String>) -> Self {
        UnshackleError::StepFailed(message.into())
    }

    /// Returns `true` if the process has already been halted for this error.
    ///
    /// Lifecycle violations and command failures halt at the point they occur,
    /// so a terminal handler must not halt a second time.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            UnshackleError::AlreadyStarted
                | UnshackleError::CommandFailed { .. }
                | UnshackleError::CommandSpawn { .. }
        )
    }
}

/// A convenience alias for `Result<T, UnshackleError>`.
pub type Result<T> = std::result::Result<T, UnshackleError>;

// ---------------------------------------------------------------------------
// StepValue: output handed from one step to the next
// ---------------------------------------------------------------------------

/// Output of a step, passed as input to the step appended after it.
///
/// Print steps yield `Null`, commands and prompts yield a `String`, and
/// function steps yield whatever they return.
pub type StepValue = serde_json::Value;

// ---------------------------------------------------------------------------
// StepKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Print,
    Command,
    Function,
    Prompt,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Print => "print",
            StepKind::Command => "command",
            StepKind::Function => "function",
            StepKind::Prompt => "prompt",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
