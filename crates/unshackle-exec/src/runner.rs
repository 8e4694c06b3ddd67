use async_trait::async_trait;
use tokio::sync::mpsc;

/// One line of output relayed while a command is still running.
///
/// Lines keep their original framing (including the trailing newline, if any);
/// consumers decide how to trim them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

impl OutputLine {
    pub fn text(&self) -> &str {
        match self {
            OutputLine::Stdout(s) | OutputLine::Stderr(s) => s,
        }
    }
}

/// Result of running a command to completion.
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Abstraction over the facility that runs a command line.
///
/// Implementations stream output through `lines` while the command runs and
/// drop every sender before returning, so the receiving side sees the stream
/// end once the final [`ExecResult`] is available. A non-zero exit is reported
/// through `exit_code`, not as an error; `Err` is reserved for failing to run
/// the command at all.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(
        &self,
        command: &str,
        lines: mpsc::UnboundedSender<OutputLine>,
    ) -> unshackle_types::Result<ExecResult>;
}
