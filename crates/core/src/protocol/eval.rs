//! Remote expression evaluation
//!
//! The expression is wrapped in a `console.log` that prints its JSON value
//! between two markers. The reply shares the byte stream with whatever else
//! the device prints, so the result is cut out of the accumulated buffer and
//! everything around it is handed back to the previous listener.

use serde::de::DeserializeOwned;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::framing::{eval_command, extract_result};
use super::prompt::sync_prompt;
use super::ProtocolConfig;
use crate::channel::{ByteChannel, Exchange};
use crate::error::{CoreError, Result};

/// State of an evaluation waiting for its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    AwaitingMarkers,
    Completed,
    Aborted,
}

/// Poll-timer bookkeeping for one evaluation
///
/// Driven by two inputs: [`bytes_received`](Self::bytes_received) for every
/// chunk and [`tick`](Self::tick) for every timer period. A tick with no
/// bytes since the previous one is idle. The evaluation is aborted after more
/// than `max_idle_ticks` idle ticks in a row, or once `max_total_ticks` ticks
/// have elapsed even if the device keeps talking.
#[derive(Debug, Clone)]
pub struct EvalPoll {
    state: PollState,
    ticks: u32,
    idle_ticks: u32,
    active: bool,
    max_idle_ticks: u32,
    max_total_ticks: u32,
}

impl EvalPoll {
    pub fn new(max_idle_ticks: u32, max_total_ticks: u32) -> Self {
        Self {
            state: PollState::AwaitingMarkers,
            ticks: 0,
            idle_ticks: 0,
            active: false,
            max_idle_ticks,
            max_total_ticks,
        }
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(config.max_idle_ticks, config.max_total_ticks)
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Total ticks seen
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Consecutive idle ticks
    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }

    /// Record that new bytes arrived
    pub fn bytes_received(&mut self) {
        if self.state == PollState::AwaitingMarkers {
            self.active = true;
        }
    }

    /// Mark the result as found
    pub fn complete(&mut self) {
        if self.state == PollState::AwaitingMarkers {
            self.state = PollState::Completed;
        }
    }

    /// Advance one timer period and return the resulting state
    pub fn tick(&mut self) -> PollState {
        if self.state != PollState::AwaitingMarkers {
            return self.state;
        }

        self.ticks += 1;
        if std::mem::take(&mut self.active) {
            self.idle_ticks = 0;
        } else {
            self.idle_ticks += 1;
        }

        if self.idle_ticks > self.max_idle_ticks || self.ticks >= self.max_total_ticks {
            self.state = PollState::Aborted;
        }
        self.state
    }
}

/// Evaluate `expr` on the device and return its raw JSON text
///
/// # Behavior
/// 1. Fail with `NotConnected` (writing nothing) if the channel is down
/// 2. Get a prompt with [`sync_prompt`]; either outcome is fine
/// 3. Send the marker-wrapped command and collect the reply
/// 4. Return the text between the markers, or `None` if the device went
///    quiet or kept talking without ever producing a result
///
/// The payload is returned as printed, including the spaces `console.log`
/// puts around arguments.
pub async fn evaluate<C>(channel: &C, expr: &str, config: &ProtocolConfig) -> Result<Option<String>>
where
    C: ByteChannel + ?Sized,
{
    if !channel.is_connected() {
        tracing::error!("evaluate called when not connected");
        return Err(CoreError::NotConnected);
    }

    let outcome = sync_prompt(channel, config).await?;
    tracing::debug!("Prompt synchronized ({:?}), evaluating {}", outcome, expr);

    let mut exchange = Exchange::acquire(channel);
    exchange.write(&eval_command(expr))?;

    let mut poll = EvalPoll::from_config(config);
    let mut ticker = interval_at(Instant::now() + config.poll_interval, config.poll_interval);
    // a stalled runtime must not replay missed ticks as idle ones
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // queued bytes count before a tick that is due at the same time
        tokio::select! {
            biased;
            Some(_) = exchange.recv() => {
                poll.bytes_received();
                if let Some(payload) = extract_result(exchange.buffer_mut()) {
                    poll.complete();
                    let result = String::from_utf8_lossy(&payload).into_owned();
                    tracing::debug!("Got result {:?}", result);
                    return Ok(Some(result));
                }
            }
            _ = ticker.tick() => {
                if poll.tick() == PollState::Aborted {
                    tracing::warn!(
                        "No result found after {} ticks - just got {:?}",
                        poll.ticks(),
                        String::from_utf8_lossy(exchange.buffer())
                    );
                    return Ok(None);
                }
            }
        }
    }
}

/// Evaluate `expr` and decode the result as JSON
pub async fn evaluate_json<C, T>(channel: &C, expr: &str, config: &ProtocolConfig) -> Result<Option<T>>
where
    C: ByteChannel + ?Sized,
    T: DeserializeOwned,
{
    match evaluate(channel, expr, config).await? {
        Some(raw) => parse_result(&raw),
        None => Ok(None),
    }
}

/// Decode a raw result payload
///
/// `undefined` (what `JSON.stringify` yields for functions and `undefined`)
/// and an empty payload decode to `None`.
pub fn parse_result<T: DeserializeOwned>(raw: &str) -> Result<Option<T>> {
    let text = raw.trim();
    if text.is_empty() || text == "undefined" {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(text)?))
}
