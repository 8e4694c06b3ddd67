use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use unshackle_types::Result;

use crate::runner::{CommandRunner, ExecResult, OutputLine};

/// A [`CommandRunner`] that replays canned results instead of spawning processes.
///
/// Commands without a canned result succeed with no output. Every command line
/// is recorded in execution order.
pub struct ScriptedRunner {
    results: Mutex<HashMap<String, ExecResult>>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(HashMap::new()),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Reply to `command` with the given output and exit code.
    pub fn on(self, command: &str, stdout: &str, stderr: &str, exit_code: i32) -> Self {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                command.to_string(),
                ExecResult {
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                    exit_code: Some(exit_code),
                    duration_ms: 0,
                },
            );
        self
    }

    /// Command lines executed so far.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn execute(
        &self,
        command: &str,
        lines: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<ExecResult> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.to_string());

        let result = self
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(command)
            .cloned()
            .unwrap_or(ExecResult {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: Some(0),
                duration_ms: 0,
            });

        for line in result.stdout.split_inclusive('\n') {
            let _ = lines.send(OutputLine::Stdout(line.to_string()));
        }
        for line in result.stderr.split_inclusive('\n') {
            let _ = lines.send(OutputLine::Stderr(line.to_string()));
        }
        Ok(result)
    }
}
