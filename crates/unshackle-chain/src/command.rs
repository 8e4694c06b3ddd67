//! The body of a `run` step: a shell command line or a function.

use std::future::Future;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;

use unshackle_exec::OutputLine;
use unshackle_types::{Result, StepKind, StepValue, UnshackleError};

use crate::engine::Engine;
use crate::events::ChainEvent;

/// A function step: receives the previous step's output and produces the next.
pub type StepFn = Box<dyn FnOnce(StepValue) -> BoxFuture<'static, Result<StepValue>> + Send>;

/// What a `run` step executes.
pub enum Command {
    /// A command line handed to the engine's command runner.
    Shell(String),
    /// A computation over the previous step's output.
    Function(StepFn),
}

impl Command {
    pub fn shell(line: impl Into<String>) -> Self {
        Command::Shell(line.into())
    }

    /// A synchronous function step.
    pub fn func<F>(f: F) -> Self
    where
        F: FnOnce(StepValue) -> Result<StepValue> + Send + 'static,
    {
        Command::Function(Box::new(move |input| futures::future::ready(f(input)).boxed()))
    }

    /// An asynchronous function step. The chain waits for its future.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: FnOnce(StepValue) -> Fut + Send + 'static,
        Fut: Future<Output = Result<StepValue>> + Send + 'static,
    {
        Command::Function(Box::new(move |input| f(input).boxed()))
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Command::Shell(_) => StepKind::Command,
            Command::Function(_) => StepKind::Function,
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Shell(line) => f.debug_tuple("Shell").field(line).finish(),
            Command::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<&str> for Command {
    fn from(line: &str) -> Self {
        Command::shell(line)
    }
}

impl From<String> for Command {
    fn from(line: String) -> Self {
        Command::Shell(line)
    }
}

// ---------------------------------------------------------------------------
// Shell execution
// ---------------------------------------------------------------------------

/// Run `command` to completion, relaying its output as it arrives.
///
/// Failing to run, or a non-zero exit, halts the process with status 1.
pub(crate) async fn run_shell(engine: Engine, command: String) -> Result<StepValue> {
    engine.out(&format!("$ {command}"));

    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let runner = engine.runner();
    let relay = async {
        while let Some(line) = rx.recv().await {
            let text = line.text().trim_end();
            if text.is_empty() {
                continue;
            }
            match line {
                OutputLine::Stdout(_) => engine.out(text),
                OutputLine::Stderr(_) => engine.err(text),
            }
        }
    };
    let (result, ()) = tokio::join!(runner.execute(&command, tx), relay);

    let exec = match result {
        Ok(exec) => exec,
        Err(err) => return Err(engine.abort(err)),
    };

    tracing::info!(
        command = %command,
        exit_code = ?exec.exit_code,
        duration_ms = exec.duration_ms,
        "Command finished"
    );
    engine.emit(ChainEvent::CommandFinished {
        command: command.clone(),
        exit_code: exec.exit_code,
        duration_ms: exec.duration_ms,
    });

    if !exec.success() {
        return Err(engine.abort(UnshackleError::CommandFailed {
            command,
            exit_code: exec.exit_code,
        }));
    }

    let output = exec.stdout.trim();
    if output.is_empty() {
        engine.out("no output");
    }
    Ok(StepValue::String(output.to_string()))
}
