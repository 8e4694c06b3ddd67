//! Raw operator input.
//!
//! An [`InputSource`] yields chunks of text exactly as the operator typed
//! them, framing included. The engine consumes exactly one source through a
//! single dispatcher task. The process stdin is read by one background thread
//! per process and fanned out through a broadcast channel, so building several
//! engines never stacks up competing stdin readers.

use std::io::BufRead;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

#[async_trait]
pub trait InputSource: Send + 'static {
    /// The next chunk of raw input, or `None` once the stream has closed.
    async fn next_chunk(&mut self) -> Option<String>;
}

#[async_trait]
impl InputSource for mpsc::UnboundedReceiver<String> {
    async fn next_chunk(&mut self) -> Option<String> {
        self.recv().await
    }
}

#[async_trait]
impl InputSource for broadcast::Receiver<String> {
    async fn next_chunk(&mut self) -> Option<String> {
        loop {
            match self.recv().await {
                Ok(chunk) => return Some(chunk),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Operator input arrived faster than it was read");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Process stdin
// ---------------------------------------------------------------------------

const STDIN_FEED_CAPACITY: usize = 64;

static STDIN_FEED: OnceLock<Arc<StdinFeed>> = OnceLock::new();

struct StdinFeed {
    // Taken on EOF so that every subscriber observes the close.
    sender: Mutex<Option<broadcast::Sender<String>>>,
    // Subscribed before the reader thread starts; handed to the first caller.
    first: Mutex<Option<broadcast::Receiver<String>>>,
}

impl StdinFeed {
    /// Subscribe the first receiver, then start the reader thread over the
    /// source `open` returns.
    fn start<R, F>(open: F) -> Arc<Self>
    where
        R: BufRead,
        F: FnOnce() -> R + Send + 'static,
    {
        let (sender, first) = broadcast::channel(STDIN_FEED_CAPACITY);
        let feed = Arc::new(StdinFeed {
            sender: Mutex::new(Some(sender)),
            first: Mutex::new(Some(first)),
        });
        let reader = Arc::clone(&feed);
        if let Err(err) = std::thread::Builder::new()
            .name("unshackle-stdin".into())
            .spawn(move || reader.pump(open()))
        {
            tracing::error!(error = %err, "Could not start the stdin reader");
        }
        feed
    }

    fn pump(&self, mut source: impl BufRead) {
        let mut line = String::new();
        loop {
            line.clear();
            match source.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if let Some(sender) = self.sender().as_ref() {
                        let _ = sender.send(line.clone());
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to read operator input");
                    break;
                }
            }
        }
        tracing::debug!("Operator input closed");
        self.sender().take();
    }

    fn sender(&self) -> std::sync::MutexGuard<'_, Option<broadcast::Sender<String>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        let first = self
            .first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(receiver) = first {
            return receiver;
        }
        match self.sender().as_ref() {
            Some(sender) => sender.subscribe(),
            // Already closed: hand out a receiver whose sender is gone.
            None => broadcast::channel(1).1,
        }
    }
}

/// Subscribe to the process stdin, one line per chunk.
///
/// The reader thread is started on first use and shared by every subscriber.
/// The first subscriber sees every line read, including lines piped in before
/// it started listening.
pub fn stdin_feed() -> broadcast::Receiver<String> {
    STDIN_FEED
        .get_or_init(|| StdinFeed::start(|| std::io::stdin().lock()))
        .subscribe()
}
