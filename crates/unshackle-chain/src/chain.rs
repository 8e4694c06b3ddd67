//! The fluent chain surface.
//!
//! Every operation consumes the chain and returns a new one wrapping the
//! extended computation. Nothing runs until the chain is driven, either with
//! [`Chain::done`] or by awaiting it directly.

use std::future::IntoFuture;

use futures::future::FutureExt;

use unshackle_types::{Result, StepKind, StepValue, EXIT_FAILURE, EXIT_SUCCESS};

use crate::command::{run_shell, Command};
use crate::engine::{Body, Engine, Pending};
use crate::options::{PromptOptions, StepOptions};
use crate::prompt::ask;

#[must_use = "a chain does nothing until it is driven with `done` or awaited"]
pub struct Chain {
    engine: Engine,
    pending: Pending,
}

impl Chain {
    pub(crate) fn new(engine: Engine, pending: Pending) -> Self {
        Self { engine, pending }
    }

    /// Print `message`.
    pub fn print(self, message: impl Into<String>) -> Chain {
        self.print_step(None, message.into())
    }

    /// Print `message` as a step labeled `mark`.
    pub fn print_at(self, mark: impl Into<String>, message: impl Into<String>) -> Chain {
        self.print_step(Some(mark.into()), message.into())
    }

    /// Run a shell command line or a function step.
    pub fn run(self, command: impl Into<Command>) -> Chain {
        self.run_with(StepOptions::default(), command)
    }

    /// Run a step labeled `mark`.
    pub fn run_at(self, mark: impl Into<String>, command: impl Into<Command>) -> Chain {
        self.run_with(StepOptions::at(mark), command)
    }

    /// Run a step with explicit options. Required steps run even while
    /// fast-forwarding to a later mark.
    pub fn run_with(self, options: StepOptions, command: impl Into<Command>) -> Chain {
        let command = command.into();
        let kind = command.kind();
        let body: Body = match command {
            Command::Shell(line) => {
                let engine = self.engine.clone();
                Box::new(move |_| run_shell(engine, line).boxed())
            }
            Command::Function(f) => f,
        };
        self.append(options.mark, kind, body, !options.required)
    }

    /// Wait for the operator to type `y`.
    pub fn prompt(self, message: impl Into<String>) -> Chain {
        self.prompt_with(PromptOptions::default(), message)
    }

    /// Wait for the operator to type one of `options.choices`. The step
    /// yields the accepted input and always runs, even while fast-forwarding.
    pub fn prompt_with(self, options: PromptOptions, message: impl Into<String>) -> Chain {
        let engine = self.engine.clone();
        let message = message.into();
        let choices = options.choices;
        let body: Body = Box::new(move |_| ask(engine, message, choices).boxed());
        self.append(options.mark, StepKind::Prompt, body, false)
    }

    /// Drive the chain to completion and halt.
    ///
    /// Success halts with status 0 and `message`. A failure halts with status
    /// 1 and the failure's message, unless the failure already halted the
    /// process. Returns the status for terminators that do not end the process.
    pub async fn done(self, message: Option<&str>) -> i32 {
        let Chain { engine, pending } = self;
        match pending.await {
            Ok(_) => engine.halt(EXIT_SUCCESS, message),
            Err(err) if err.is_fatal() => EXIT_FAILURE,
            Err(err) => engine.fail(&err.to_string()),
        }
    }

    /// Abandon the chain and halt with status 1.
    pub fn fail(self, message: &str) -> i32 {
        self.engine.fail(message)
    }

    /// The pending computation: the output of the last step once the chain
    /// has run.
    pub fn into_pending(self) -> Pending {
        self.pending
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn print_step(self, mark: Option<String>, message: String) -> Chain {
        let engine = self.engine.clone();
        let body: Body = Box::new(move |_| {
            engine.out(&message);
            futures::future::ready(Ok(StepValue::Null)).boxed()
        });
        self.append(mark, StepKind::Print, body, true)
    }

    fn append(self, mark: Option<String>, kind: StepKind, body: Body, skippable: bool) -> Chain {
        let Chain { engine, pending } = self;
        let pending = engine.wrap(mark, kind, pending, body, skippable);
        Chain { engine, pending }
    }
}

impl IntoFuture for Chain {
    type Output = Result<StepValue>;
    type IntoFuture = Pending;

    fn into_future(self) -> Self::IntoFuture {
        self.pending
    }
}
