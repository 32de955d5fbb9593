//! REPL synchronization and remote evaluation protocol
//!
//! Both operations borrow the channel's listener slot through an
//! [`Exchange`](crate::channel::Exchange) for their duration. They do not
//! queue: callers must not run two of them concurrently on one channel
//! (see [`Device`](crate::Device) for a serializing wrapper).

pub mod eval;
pub mod framing;
pub mod prompt;

pub use eval::{evaluate, evaluate_json, parse_result, EvalPoll, PollState};
pub use framing::{eval_command, extract_result};
pub use prompt::{sync_prompt, PromptOutcome};

use std::time::Duration;

/// Timing for prompt synchronization and evaluation polling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// How long to wait for a prompt before sending an interrupt
    pub prompt_timeout: Duration,

    /// Period of the evaluation poll timer
    pub poll_interval: Duration,

    /// Consecutive ticks without new bytes tolerated before giving up
    pub max_idle_ticks: u32,

    /// Tick count at which an evaluation is abandoned even if bytes keep arriving
    pub max_total_ticks: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            prompt_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(500),
            max_idle_ticks: 2,   // ~1s of silence
            max_total_ticks: 20, // ~10s overall
        }
    }
}

impl ProtocolConfig {
    /// Set the prompt wait
    pub fn with_prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    /// Set the poll period
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set idle and total tick limits
    pub fn with_tick_limits(mut self, max_idle_ticks: u32, max_total_ticks: u32) -> Self {
        self.max_idle_ticks = max_idle_ticks;
        self.max_total_ticks = max_total_ticks;
        self
    }
}
