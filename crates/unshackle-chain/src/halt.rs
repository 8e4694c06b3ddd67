//! Process termination.

use std::sync::{Mutex, PoisonError};

/// Ends execution with a status code.
///
/// The real implementation never returns. Test implementations record the
/// code and return, so callers must not assume control stops here.
pub trait Terminator: Send + Sync {
    fn exit(&self, code: i32);
}

/// Terminates the current process via [`std::process::exit`].
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Records requested exit codes instead of terminating.
pub struct RecordingTerminator {
    codes: Mutex<Vec<i32>>,
}

impl RecordingTerminator {
    pub fn new() -> Self {
        Self {
            codes: Mutex::new(Vec::new()),
        }
    }

    pub fn codes(&self) -> Vec<i32> {
        self.codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<i32> {
        self.codes().last().copied()
    }
}

impl Default for RecordingTerminator {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminator for RecordingTerminator {
    fn exit(&self, code: i32) {
        self.codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(code);
    }
}
