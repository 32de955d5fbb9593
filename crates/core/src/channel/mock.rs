//! In-memory channel for tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{ByteChannel, Listener};
use crate::error::{CoreError, Result};

/// Scripted reply: when a write contains `trigger`, emit `chunks`
struct Reply {
    trigger: Vec<u8>,
    chunks: Vec<Vec<u8>>,
}

#[derive(Default)]
struct MockState {
    listener: Option<Listener>,
    writes: Vec<Vec<u8>>,
    replies: VecDeque<Reply>,
    last_line: String,
    disconnected: bool,
    fail_writes: bool,
}

/// Mock channel for testing
///
/// Records every write and lets tests push bytes to the active listener,
/// either directly with [`feed`](Self::feed) or in response to a write.
#[derive(Default)]
pub struct MockChannel {
    state: Mutex<MockState>,
}

impl MockChannel {
    /// Connected channel with an empty last line
    pub fn new() -> Self {
        Self::default()
    }

    /// Connected channel already sitting at the prompt
    pub fn at_prompt() -> Self {
        let channel = Self::new();
        channel.set_last_line(">");
        channel
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the value reported by `last_displayed_line`
    pub fn set_last_line(&self, line: &str) {
        self.state().last_line = line.to_string();
    }

    /// Set the value reported by `is_connected`
    pub fn set_connected(&self, connected: bool) {
        self.state().disconnected = !connected;
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Queue a one-shot reply to the first write containing `trigger`
    pub fn reply_to(&self, trigger: &[u8], chunks: &[&[u8]]) {
        self.state().replies.push_back(Reply {
            trigger: trigger.to_vec(),
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
        });
    }

    /// Deliver bytes to the active listener as if read from the device
    pub fn feed(&self, data: &[u8]) {
        let listener = self.state().listener.clone();
        if let Some(listener) = listener {
            listener(data);
        }
    }

    /// All writes, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    /// All written bytes concatenated
    pub fn written(&self) -> Vec<u8> {
        self.state().writes.concat()
    }

    /// Currently installed listener
    pub fn listener(&self) -> Option<Listener> {
        self.state().listener.clone()
    }
}

impl ByteChannel for MockChannel {
    fn write(&self, data: &[u8]) -> Result<()> {
        let chunks = {
            let mut state = self.state();
            if state.fail_writes {
                return Err(CoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "mock write failure",
                )));
            }
            state.writes.push(data.to_vec());

            let matched = state
                .replies
                .iter()
                .position(|r| contains(data, &r.trigger));
            matched
                .and_then(|i| state.replies.remove(i))
                .map(|r| r.chunks)
                .unwrap_or_default()
        };

        for chunk in chunks {
            self.feed(&chunk);
        }
        Ok(())
    }

    fn subscribe(&self, listener: Option<Listener>) -> Option<Listener> {
        std::mem::replace(&mut self.state().listener, listener)
    }

    fn is_connected(&self) -> bool {
        !self.state().disconnected
    }

    fn last_displayed_line(&self) -> String {
        self.state().last_line.clone()
    }
}

/// Listener that appends everything it receives to a shared buffer
pub fn recorder() -> (Listener, Arc<Mutex<Vec<u8>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let listener: Listener = Arc::new(move |data: &[u8]| {
        if let Ok(mut buf) = sink.lock() {
            buf.extend_from_slice(data);
        }
    });
    (listener, received)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
