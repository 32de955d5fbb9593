//! Serialized access to one device
//!
//! The protocol functions assume exclusive use of the channel. `Device`
//! holds a lock across each operation so concurrent callers queue up
//! instead of stealing each other's listener.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::channel::ByteChannel;
use crate::error::Result;
use crate::protocol::{self, PromptOutcome, ProtocolConfig};

/// A device reachable over a byte channel
pub struct Device<C: ByteChannel> {
    channel: Arc<C>,
    config: ProtocolConfig,
    lock: Mutex<()>,
}

impl<C: ByteChannel> Device<C> {
    /// Wrap a channel with default timing
    pub fn new(channel: Arc<C>) -> Self {
        Self {
            channel,
            config: ProtocolConfig::default(),
            lock: Mutex::new(()),
        }
    }

    /// Use custom timing
    pub fn with_config(mut self, config: ProtocolConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// See [`protocol::sync_prompt`]
    pub async fn sync_prompt(&self) -> Result<PromptOutcome> {
        let _guard = self.lock.lock().await;
        protocol::sync_prompt(&*self.channel, &self.config).await
    }

    /// See [`protocol::evaluate`]
    pub async fn evaluate(&self, expr: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        protocol::evaluate(&*self.channel, expr, &self.config).await
    }

    /// See [`protocol::evaluate_json`]
    pub async fn evaluate_json<T: DeserializeOwned>(&self, expr: &str) -> Result<Option<T>> {
        let _guard = self.lock.lock().await;
        protocol::evaluate_json(&*self.channel, expr, &self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;
    use crate::protocol::eval_command;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_evaluations_are_serialized() {
        let channel = Arc::new(MockChannel::at_prompt());
        let device = Device::new(channel.clone());

        // replies arrive late so the first exchange is still open when the
        // second caller arrives
        let feeder = {
            let channel = channel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                channel.feed(b"< <<1>> >");
                tokio::time::sleep(Duration::from_millis(300)).await;
                channel.feed(b"< <<2>> >");
            })
        };

        let (a, b) = tokio::join!(device.evaluate("a"), device.evaluate("b"));

        assert_eq!(a.unwrap().as_deref(), Some("1"));
        assert_eq!(b.unwrap().as_deref(), Some("2"));
        assert_eq!(channel.writes(), vec![eval_command("a"), eval_command("b")]);
        feeder.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_uses_config() {
        let channel = Arc::new(MockChannel::new());
        let device = Device::new(channel.clone())
            .with_config(ProtocolConfig::default().with_prompt_timeout(Duration::from_millis(50)));
        assert_eq!(device.config().prompt_timeout, Duration::from_millis(50));

        let started = tokio::time::Instant::now();
        let outcome = device.sync_prompt().await.unwrap();
        assert!(outcome.interrupted());
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_evaluate_json() {
        let channel = Arc::new(MockChannel::at_prompt());
        channel.reply_to(b"console.log", &[b"< << [1,2,3] >> >"]);
        let device = Device::new(channel);

        let values: Option<Vec<u8>> = device.evaluate_json("[1,2,3]").await.unwrap();
        assert_eq!(values, Some(vec![1, 2, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_not_connected() {
        let channel = Arc::new(MockChannel::at_prompt());
        channel.set_connected(false);
        let device = Device::new(channel.clone());

        assert!(!device.is_connected());
        assert!(device.evaluate("1").await.is_err());
        assert!(device.channel().writes().is_empty());
    }
}
