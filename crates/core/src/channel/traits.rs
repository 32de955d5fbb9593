//! Byte channel abstraction

use std::sync::Arc;

use crate::error::Result;

/// Receiver of raw bytes read from the device
pub type Listener = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Shared link to a device with a single listener slot
///
/// The transport (serial port, PTY, BLE, ...) lives outside this crate and
/// implements this trait. Implementations dispatch every received chunk to
/// the currently subscribed listener, if any.
pub trait ByteChannel: Send + Sync {
    /// Write raw bytes to the device
    fn write(&self, data: &[u8]) -> Result<()>;

    /// Replace the active listener, returning the one previously installed
    fn subscribe(&self, listener: Option<Listener>) -> Option<Listener>;

    /// Whether the link is currently up
    fn is_connected(&self) -> bool;

    /// Text of the last line shown on the device console
    fn last_displayed_line(&self) -> String;
}
