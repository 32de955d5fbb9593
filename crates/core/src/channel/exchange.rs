//! Exclusive use of a channel's listener slot
//!
//! An [`Exchange`] installs its own listener when acquired and puts the
//! previous listener back when dropped, whatever the exit path. Bytes the
//! exchange received but did not claim are forwarded to the restored
//! listener so nothing read from the device is lost.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use bytes::Bytes;
use tokio::sync::mpsc;

use super::traits::{ByteChannel, Listener};
use crate::error::Result;

/// Where the exchange's listener sends a chunk
///
/// Shared between the listener and the exchange. While `queue` is set,
/// chunks go to the exchange; once it is cleared they go to `previous`.
/// A channel may still hold a copy of the listener after the slot was
/// swapped back, so late chunks take the second path.
struct Route {
    queue: Option<mpsc::UnboundedSender<Bytes>>,
    previous: Option<Listener>,
}

impl Route {
    fn deliver(&self, data: &[u8]) {
        if let Some(tx) = &self.queue {
            match tx.send(Bytes::copy_from_slice(data)) {
                Ok(()) => return,
                Err(_) => tracing::debug!("Exchange queue closed, forwarding {} bytes", data.len()),
            }
        }
        forward(self.previous.as_ref(), data);
    }
}

fn lock(route: &Mutex<Route>) -> MutexGuard<'_, Route> {
    route.lock().unwrap_or_else(|e| e.into_inner())
}

fn forward(listener: Option<&Listener>, data: &[u8]) {
    match listener {
        Some(listener) => listener(data),
        None => tracing::debug!("No previous listener, discarding {} unclaimed bytes", data.len()),
    }
}

/// Pending request on a [`ByteChannel`]
pub struct Exchange<'a, C: ByteChannel + ?Sized> {
    channel: &'a C,
    previous: Option<Listener>,
    route: Weak<Mutex<Route>>,
    rx: mpsc::UnboundedReceiver<Bytes>,
    buffer: Vec<u8>,
}

impl<'a, C: ByteChannel + ?Sized> Exchange<'a, C> {
    /// Save the active listener and install one feeding this exchange
    pub fn acquire(channel: &'a C) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        // the listener owns the route; once the channel drops every copy
        // the sender goes with it and `recv` returns `None`
        let route = Arc::new(Mutex::new(Route {
            queue: Some(tx),
            previous: None,
        }));
        let weak = Arc::downgrade(&route);
        let listener: Listener = Arc::new(move |data: &[u8]| lock(&route).deliver(data));

        let previous = channel.subscribe(Some(listener));
        if let Some(route) = weak.upgrade() {
            lock(&route).previous = previous.clone();
        }

        Self {
            channel,
            previous,
            route: weak,
            rx,
            buffer: Vec::new(),
        }
    }

    /// Write raw bytes to the underlying channel
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.channel.write(data)
    }

    /// Wait for the next chunk and append it to the buffer
    ///
    /// Returns `None` if the channel dropped this exchange's listener.
    pub async fn recv(&mut self) -> Option<Bytes> {
        let chunk = self.rx.recv().await?;
        self.buffer.extend_from_slice(&chunk);
        tracing::trace!("Exchange received {} bytes", chunk.len());
        Some(chunk)
    }

    /// Bytes accumulated so far
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Mutable access for callers that claim part of the buffer
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }

    /// Explicitly end the exchange (same as dropping it)
    pub fn release(self) {}
}

impl<C: ByteChannel + ?Sized> Drop for Exchange<'_, C> {
    fn drop(&mut self) {
        let previous = self.previous.take();

        // Holding the route blocks deliveries until the buffer is out, so
        // anything arriving later reaches `previous` after it.
        let route = self.route.upgrade();
        {
            let mut guard = route.as_deref().map(lock);
            if let Some(route) = guard.as_mut() {
                route.queue = None;
            }

            while let Ok(chunk) = self.rx.try_recv() {
                self.buffer.extend_from_slice(&chunk);
            }
            if !self.buffer.is_empty() {
                forward(previous.as_ref(), &self.buffer);
            }
        }

        self.channel.subscribe(previous);
    }
}
