//! Output sink for operator-facing messages.

use std::sync::{Mutex, PoisonError};

/// Where a chain writes the lines an operator reads.
pub trait Console: Send + Sync {
    /// Write a line to the normal message stream.
    fn out(&self, line: &str);

    /// Write a line to the error stream.
    fn err(&self, line: &str);
}

// ---------------------------------------------------------------------------
// StdConsole
// ---------------------------------------------------------------------------

/// Writes to the process's stdout and stderr.
pub struct StdConsole;

impl Console for StdConsole {
    fn out(&self, line: &str) {
        println!("{line}");
    }

    fn err(&self, line: &str) {
        eprintln!("{line}");
    }
}

// ---------------------------------------------------------------------------
// RecordingConsole
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Out(String),
    Err(String),
}

/// Captures every line in the order it was written.
pub struct RecordingConsole {
    lines: Mutex<Vec<ConsoleLine>>,
}

impl RecordingConsole {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
        }
    }

    /// All lines from both streams, interleaved in write order.
    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn out_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ConsoleLine::Out(s) => Some(s),
                ConsoleLine::Err(_) => None,
            })
            .collect()
    }

    pub fn err_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ConsoleLine::Err(s) => Some(s),
                ConsoleLine::Out(_) => None,
            })
            .collect()
    }

    fn push(&self, line: ConsoleLine) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }
}

impl Default for RecordingConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for RecordingConsole {
    fn out(&self, line: &str) {
        self.push(ConsoleLine::Out(line.to_string()));
    }

    fn err(&self, line: &str) {
        self.push(ConsoleLine::Err(line.to_string()));
    }
}
