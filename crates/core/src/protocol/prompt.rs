//! Bring the remote REPL to an idle prompt

use tokio::time::sleep;

use super::framing::{ends_with_prompt, INTERRUPT, PROMPT_MARKER};
use super::ProtocolConfig;
use crate::channel::{ByteChannel, Exchange};
use crate::error::Result;

/// How the prompt was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// A prompt was already shown or appeared after a newline
    Ready,
    /// No prompt appeared in time; an interrupt was sent
    Interrupted,
}

impl PromptOutcome {
    /// True if the REPL had to be interrupted
    pub fn interrupted(self) -> bool {
        self == PromptOutcome::Interrupted
    }
}

/// Make sure the REPL is waiting for input
///
/// # Behavior
/// 1. If the console already shows `>`, return `Ready` without writing
/// 2. Otherwise send a newline and wait for a reply ending in `>`
/// 3. If none arrives within `prompt_timeout`, send Ctrl-C and return
///    `Interrupted`
///
/// Everything read while waiting is forwarded to the previous listener.
/// An interrupt is best-effort recovery, not a failure; only channel write
/// errors are returned as `Err`.
pub async fn sync_prompt<C>(channel: &C, config: &ProtocolConfig) -> Result<PromptOutcome>
where
    C: ByteChannel + ?Sized,
{
    if channel.last_displayed_line().as_bytes() == [PROMPT_MARKER] {
        tracing::debug!("Found a prompt");
        return Ok(PromptOutcome::Ready);
    }

    let mut exchange = Exchange::acquire(channel);
    exchange.write(b"\n")?;

    let timeout = sleep(config.prompt_timeout);
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            biased;
            Some(_) = exchange.recv() => {
                if ends_with_prompt(exchange.buffer()) {
                    tracing::debug!("Received a prompt after sending newline");
                    return Ok(PromptOutcome::Ready);
                }
            }
            _ = &mut timeout => {
                tracing::warn!(
                    "No prompt found, got {:?} - issuing Ctrl-C",
                    String::from_utf8_lossy(exchange.buffer())
                );
                exchange.write(&[INTERRUPT])?;
                return Ok(PromptOutcome::Interrupted);
            }
        }
    }
}
