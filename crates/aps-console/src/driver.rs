//! Command/response driver on top of a raw console
//!
//! Controller shells print no end-of-output sentinel, so the driver
//! paces each command: send the line, give the shell a settle window,
//! then drain chunks until a prompt character shows up or the read
//! ceiling passes.

use std::time::Duration;

use aps_core::error::ConnectError;
use aps_core::traits::RemoteConsole;
use tracing::debug;

/// Poll window for a single drain read.
///
/// Short enough to notice the prompt quickly, long enough to avoid
/// spinning while the controller is still formatting output.
pub const DRAIN_POLL_WINDOW: Duration = Duration::from_millis(100);

/// Default pause between sending a command and reading its output
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(1);

/// Default upper bound on draining a single command's output
pub const DEFAULT_READ_CEILING: Duration = Duration::from_secs(5);

/// Characters that terminate a controller prompt line
pub const PROMPT_TERMINATORS: [char; 2] = ['#', '>'];

/// Paced command runner for one controller shell
pub struct ConsoleDriver {
    console: Box<dyn RemoteConsole>,
    address: String,
    settle: Duration,
    read_ceiling: Duration,
}

impl ConsoleDriver {
    /// Wrap a connected console with default pacing
    pub fn new(console: Box<dyn RemoteConsole>, address: impl Into<String>) -> Self {
        Self {
            console,
            address: address.into(),
            settle: DEFAULT_SETTLE,
            read_ceiling: DEFAULT_READ_CEILING,
        }
    }

    /// Override the default settle window
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Override the drain ceiling
    pub fn with_read_ceiling(mut self, read_ceiling: Duration) -> Self {
        self.read_ceiling = read_ceiling;
        self
    }

    /// Address of the controller this driver talks to
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Send a line without waiting for output
    pub async fn send(&mut self, line: &str) -> Result<(), ConnectError> {
        debug!(address = %self.address, line, "sending console line");
        self.console.send_line(line).await
    }

    /// Send a command and capture its output with the default settle
    pub async fn send_settled(&mut self, command: &str) -> Result<String, ConnectError> {
        let settle = self.settle;
        self.send_with_settle(command, settle).await
    }

    /// Send a command, wait `settle`, then drain its output
    pub async fn send_with_settle(
        &mut self,
        command: &str,
        settle: Duration,
    ) -> Result<String, ConnectError> {
        self.send(command).await?;
        tokio::time::sleep(settle).await;
        self.drain().await
    }

    /// Drain pending output until a prompt character or the ceiling.
    ///
    /// Only the chunk that carries the prompt stops the drain; output
    /// already buffered behind it stays queued for the next read.
    pub async fn drain(&mut self) -> Result<String, ConnectError> {
        let mut output = String::new();
        let started = tokio::time::Instant::now();
        while started.elapsed() < self.read_ceiling {
            match self.console.read_chunk(DRAIN_POLL_WINDOW).await? {
                Some(chunk) => {
                    let text = String::from_utf8_lossy(&chunk);
                    output.push_str(&text);
                    if text.contains(&PROMPT_TERMINATORS[..]) {
                        break;
                    }
                }
                None => continue,
            }
        }
        Ok(output)
    }

    /// Close the underlying console
    pub async fn close(&mut self) -> Result<(), ConnectError> {
        self.console.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bytes::Bytes;

    /// Console that replays canned chunks and records sent lines
    struct ScriptedConsole {
        chunks: Arc<Mutex<VecDeque<Bytes>>>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedConsole {
        fn new(chunks: &[&str]) -> (Self, Arc<Mutex<VecDeque<Bytes>>>, Arc<Mutex<Vec<String>>>) {
            let queue: VecDeque<Bytes> = chunks
                .iter()
                .map(|chunk| Bytes::copy_from_slice(chunk.as_bytes()))
                .collect();
            let chunks = Arc::new(Mutex::new(queue));
            let sent = Arc::new(Mutex::new(Vec::new()));
            let console = Self {
                chunks: Arc::clone(&chunks),
                sent: Arc::clone(&sent),
            };
            (console, chunks, sent)
        }
    }

    #[async_trait]
    impl RemoteConsole for ScriptedConsole {
        async fn send_line(&mut self, line: &str) -> Result<(), ConnectError> {
            self.sent
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(line.to_string());
            Ok(())
        }

        async fn read_chunk(&mut self, wait: Duration) -> Result<Option<Bytes>, ConnectError> {
            let next = self
                .chunks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .pop_front();
            match next {
                Some(chunk) => Ok(Some(chunk)),
                None => {
                    tokio::time::sleep(wait).await;
                    Ok(None)
                }
            }
        }

        async fn close(&mut self) -> Result<(), ConnectError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_settled_captures_until_prompt() {
        let (console, chunks, sent) =
            ScriptedConsole::new(&["AP Database\n", "Total APs: 12\n(host) #", "later output"]);
        let mut driver = ConsoleDriver::new(Box::new(console), "10.0.0.1");

        let output = driver.send_settled("show ap database long").await.unwrap();

        assert_eq!(output, "AP Database\nTotal APs: 12\n(host) #");
        assert_eq!(sent.lock().unwrap().as_slice(), ["show ap database long"]);
        // the chunk behind the prompt stays queued
        assert_eq!(chunks.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_stops_at_ceiling_without_prompt() {
        let (console, _, _) = ScriptedConsole::new(&["output with no terminator"]);
        let mut driver =
            ConsoleDriver::new(Box::new(console), "10.0.0.1").with_read_ceiling(Duration::from_secs(2));

        let started = tokio::time::Instant::now();
        let output = driver.drain().await.unwrap();

        assert_eq!(output, "output with no terminator");
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_with_settle_waits_before_draining() {
        let (console, _, _) = ScriptedConsole::new(&["(host) #"]);
        let mut driver = ConsoleDriver::new(Box::new(console), "10.0.0.1");

        let started = tokio::time::Instant::now();
        let output = driver
            .send_with_settle("write memory", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(output, "(host) #");
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
