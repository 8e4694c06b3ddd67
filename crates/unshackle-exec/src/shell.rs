use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use unshackle_types::{Result, UnshackleError};

use crate::runner::{CommandRunner, ExecResult, OutputLine};

/// Runs command lines through a system shell on the local machine.
pub struct ShellRunner {
    shell: String,
    working_dir: Option<PathBuf>,
    env_vars: HashMap<String, String>,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
            working_dir: None,
            env_vars: HashMap::new(),
        }
    }

    /// Use a different shell program. It is invoked as `<shell> -c <command>`.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn execute(
        &self,
        command: &str,
        lines: mpsc::UnboundedSender<OutputLine>,
    ) -> Result<ExecResult> {
        let mut cmd = tokio::process::Command::new(&self.shell);
        cmd.args(["-c", command])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .envs(&self.env_vars)
            .kill_on_drop(true);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        let start = tokio::time::Instant::now();
        let mut child = cmd.spawn().map_err(|source| UnshackleError::CommandSpawn {
            command: command.to_string(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("stderr was not piped"))?;

        let (status, stdout, stderr) = tokio::try_join!(
            async { child.wait().await.map_err(UnshackleError::from) },
            relay(stdout, lines.clone(), OutputLine::Stdout),
            relay(stderr, lines, OutputLine::Stderr),
        )?;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(command, exit_code = ?status.code(), duration_ms, "Shell command exited");

        Ok(ExecResult {
            stdout,
            stderr,
            exit_code: status.code(),
            duration_ms,
        })
    }
}

/// Forward each line read from `reader` and return everything that was read.
async fn relay<R>(
    reader: R,
    lines: mpsc::UnboundedSender<OutputLine>,
    wrap: fn(String) -> OutputLine,
) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut captured = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let chunk = String::from_utf8_lossy(&buf).into_owned();
        captured.push_str(&chunk);
        // The receiver may have gone away; the captured copy is still returned.
        let _ = lines.send(wrap(chunk));
    }
    Ok(captured)
}
