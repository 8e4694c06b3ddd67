//! Command execution for Unshackle chains.
//!
//! Provides the `CommandRunner` trait, the `ShellRunner` implementation that
//! spawns `sh -c` and streams output line by line, and `ScriptedRunner`, a
//! replaying double for tests and dry runs.

pub mod runner;
pub mod scripted;
pub mod shell;

pub use runner::{CommandRunner, ExecResult, OutputLine};
pub use scripted::ScriptedRunner;
pub use shell::ShellRunner;
