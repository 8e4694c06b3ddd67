//! Sequencing engine for scripted, interactive release chains.
//!
//! A chain is an ordered list of steps (printed messages, shell commands,
//! function steps and operator prompts) run one after another. Steps may
//! carry a mark; starting with `resume_from` fast-forwards past ordinary
//! steps until that mark, while required steps and prompts always run.
//!
//! ```no_run
//! use unshackle_chain::{Engine, PromptOptions, StartOptions, StepOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     Engine::interactive()
//!         .start(StartOptions::new().message("Releasing widget").resume_from("publish"))
//!         .run_with(StepOptions::required(), "git fetch --tags")
//!         .run_at("test", "cargo test")
//!         .prompt_with(PromptOptions::at("confirm").with_choices(["y", "n"]), "Publish?")
//!         .run_at("publish", "cargo publish")
//!         .done(Some("Released."))
//!         .await;
//! }
//! ```

pub mod chain;
pub mod command;
pub mod console;
pub mod engine;
pub mod events;
pub mod gate;
pub mod halt;
pub mod input;
pub mod options;
mod prompt;
pub mod skip;

pub use chain::Chain;
pub use command::{Command, StepFn};
pub use console::{Console, ConsoleLine, RecordingConsole, StdConsole};
pub use engine::{Engine, EngineBuilder, Pending};
pub use events::{ChainEvent, EventEmitter};
pub use gate::{InputDispatcher, InputGate, Offer};
pub use halt::{ProcessExit, RecordingTerminator, Terminator};
pub use input::{stdin_feed, InputSource};
pub use options::{PromptOptions, StartOptions, StepOptions, DEFAULT_CHOICES, DEFAULT_START_MESSAGE};
pub use skip::SkipState;
pub use unshackle_types::{Result, StepKind, StepValue, UnshackleError};
