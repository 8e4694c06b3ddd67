//! The sequencing engine: shared chain state and the step wrapper.
//!
//! An [`Engine`] owns everything a chain shares across its steps: the skip
//! state, the input gate, the lifecycle flag and the injected collaborators
//! (console, command runner, input source, terminator). Cloning an `Engine`
//! yields another handle to the **same** state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt};

use unshackle_exec::{CommandRunner, ShellRunner};
use unshackle_types::{Result, StepKind, StepValue, UnshackleError, EXIT_FAILURE, EXIT_SUCCESS};

use crate::chain::Chain;
use crate::console::{Console, StdConsole};
use crate::events::{ChainEvent, EventEmitter};
use crate::gate::{InputDispatcher, InputGate};
use crate::halt::{ProcessExit, Terminator};
use crate::input::{stdin_feed, InputSource};
use crate::options::{StartOptions, DEFAULT_START_MESSAGE};
use crate::skip::SkipState;

/// The output of the chain so far, not yet computed.
pub type Pending = BoxFuture<'static, Result<StepValue>>;

/// The work a step performs once its predecessor has settled.
pub(crate) type Body = Box<dyn FnOnce(StepValue) -> Pending + Send>;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    console: Arc<dyn Console>,
    terminator: Arc<dyn Terminator>,
    runner: Arc<dyn CommandRunner>,
    // Taken when the dispatcher attaches; stdin is used if none was configured.
    input: Mutex<Option<Box<dyn InputSource>>>,
    dispatcher_attached: AtomicBool,
    skip: SkipState,
    gate: Arc<InputGate>,
    started: AtomicBool,
    events: EventEmitter,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// An engine wired to the real process: stdout/stderr, `sh`, stdin and exit.
    pub fn interactive() -> Self {
        EngineBuilder::new().build()
    }

    /// Begin a release. May be called once per engine.
    ///
    /// Prints the start message immediately and, when `resume_from` is set,
    /// fast-forwards past every skippable step until that mark is appended.
    /// A second call halts with status 1.
    pub fn start(&self, options: StartOptions) -> Chain {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            let err = UnshackleError::AlreadyStarted;
            self.fail(&err.to_string());
            return Chain::new(self.clone(), futures::future::ready(Err(err)).boxed());
        }

        let message = options
            .message
            .unwrap_or_else(|| DEFAULT_START_MESSAGE.to_string());
        self.inner.skip.seek(options.resume_from.clone());
        self.emit(ChainEvent::ChainStarted {
            resume_from: options.resume_from,
        });
        self.out(&format!("{message}\n"));

        self.chain()
    }

    /// A chain over an already-resolved computation, without calling `start`.
    pub fn chain(&self) -> Chain {
        Chain::new(
            self.clone(),
            futures::future::ready(Ok(StepValue::Null)).boxed(),
        )
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// The mark the engine is fast-forwarding toward, if any.
    pub fn skip_target(&self) -> Option<String> {
        self.inner.skip.target()
    }

    /// Subscribe to the events of every chain built on this engine.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChainEvent> {
        self.inner.events.subscribe()
    }

    /// Halt with status 1, printing `message` to the error stream.
    pub fn fail(&self, message: &str) -> i32 {
        self.halt(EXIT_FAILURE, Some(message))
    }

    /// Print `message` (stdout on success, stderr otherwise) and exit with `code`.
    ///
    /// Returns `code` for terminators that do not end the process.
    pub fn halt(&self, code: i32, message: Option<&str>) -> i32 {
        if let Some(message) = message.filter(|m| !m.is_empty()) {
            if code == EXIT_SUCCESS {
                self.out(message);
            } else {
                self.err(message);
            }
        }
        tracing::debug!(code, "Halting");
        self.emit(ChainEvent::ChainHalted { code });
        self.inner.terminator.exit(code);
        code
    }

    /// Schedule `body` after `previous`, or pass `previous` through untouched
    /// when the engine is fast-forwarding past a skippable step.
    ///
    /// The skip decision is taken here, when the step is appended, so steps
    /// are decided in append order.
    pub(crate) fn wrap(
        &self,
        mark: Option<String>,
        kind: StepKind,
        previous: Pending,
        body: Body,
        skippable: bool,
    ) -> Pending {
        let mark = mark.filter(|m| !m.is_empty());
        if self.inner.skip.should_skip(mark.as_deref(), skippable) {
            tracing::debug!(mark = ?mark, kind = %kind, "Skipping step");
            self.emit(ChainEvent::StepSkipped { mark, kind });
            return previous;
        }

        let engine = self.clone();
        async move {
            let input = previous.await?;
            engine.emit(ChainEvent::StepStarted {
                mark: mark.clone(),
                kind,
            });
            if let Some(ref mark) = mark {
                engine.out(&format!("[{mark}]"));
            }

            match body(input).await {
                Ok(output) => {
                    engine.out("");
                    engine.emit(ChainEvent::StepCompleted { mark, kind });
                    Ok(output)
                }
                Err(err) => {
                    tracing::debug!(mark = ?mark, kind = %kind, error = %err, "Step failed");
                    engine.emit(ChainEvent::StepFailed {
                        mark,
                        kind,
                        error: err.to_string(),
                    });
                    Err(err)
                }
            }
        }
        .boxed()
    }

    /// Report a fatal error and halt with status 1. Returns the error so the
    /// chain stops without running later steps.
    pub(crate) fn abort(&self, err: UnshackleError) -> UnshackleError {
        self.err(&err.to_string());
        self.halt(EXIT_FAILURE, None);
        err
    }

    /// Start routing operator input to the gate. Only the first call attaches.
    pub(crate) fn attach_dispatcher(&self) {
        if self.inner.dispatcher_attached.swap(true, Ordering::SeqCst) {
            return;
        }
        let taken = self
            .inner
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let source: Box<dyn InputSource> = match taken {
            Some(source) => source,
            None => Box::new(stdin_feed()),
        };

        let dispatcher = InputDispatcher::new(
            self.inner.gate.clone(),
            self.inner.console.clone(),
            self.inner.events.clone(),
        );
        tracing::debug!("Attaching input dispatcher");
        tokio::spawn(dispatcher.listen(source));
    }

    pub(crate) fn out(&self, line: &str) {
        self.inner.console.out(line);
    }

    pub(crate) fn err(&self, line: &str) {
        self.inner.console.err(line);
    }

    pub(crate) fn emit(&self, event: ChainEvent) {
        self.inner.events.emit(event);
    }

    pub(crate) fn gate(&self) -> &InputGate {
        &self.inner.gate
    }

    pub(crate) fn runner(&self) -> Arc<dyn CommandRunner> {
        self.inner.runner.clone()
    }
}

// ---------------------------------------------------------------------------
// EngineBuilder
// ---------------------------------------------------------------------------

/// Configures the collaborators an [`Engine`] talks to.
///
/// Anything not set falls back to the real process: [`StdConsole`],
/// [`ShellRunner`], [`ProcessExit`] and the shared stdin feed (opened lazily,
/// on the first prompt).
pub struct EngineBuilder {
    console: Option<Arc<dyn Console>>,
    terminator: Option<Arc<dyn Terminator>>,
    runner: Option<Arc<dyn CommandRunner>>,
    input: Option<Box<dyn InputSource>>,
    event_capacity: usize,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            console: None,
            terminator: None,
            runner: None,
            input: None,
            event_capacity: 256,
        }
    }

    pub fn console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = Some(console);
        self
    }

    pub fn terminator(mut self, terminator: Arc<dyn Terminator>) -> Self {
        self.terminator = Some(terminator);
        self
    }

    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn input(mut self, input: impl InputSource) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            inner: Arc::new(EngineInner {
                console: self.console.unwrap_or_else(|| Arc::new(StdConsole)),
                terminator: self.terminator.unwrap_or_else(|| Arc::new(ProcessExit)),
                runner: self
                    .runner
                    .unwrap_or_else(|| Arc::new(ShellRunner::new())),
                input: Mutex::new(self.input),
                dispatcher_attached: AtomicBool::new(false),
                skip: SkipState::new(),
                gate: Arc::new(InputGate::new()),
                started: AtomicBool::new(false),
                events: EventEmitter::new(self.event_capacity),
            }),
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
