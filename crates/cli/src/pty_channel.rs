//! Byte channel backed by a REPL program on a pseudo-terminal
//!
//! Spawns the program with portable-pty and reads its output on a blocking
//! thread. Every chunk goes to whichever listener is subscribed at the time.

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use replsync_core::{ByteChannel, CoreError, Listener};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Program to run and the terminal it gets
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Initial rows
    pub rows: u16,

    /// Initial columns
    pub cols: u16,

    /// REPL executable
    pub program: String,

    /// Arguments passed to the program
    pub args: Vec<String>,
}

impl PtyConfig {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self {
            rows: 24,
            cols: 80,
            program,
            args,
        }
    }

    /// Create with custom size
    #[allow(dead_code)]
    pub fn with_size(mut self, rows: u16, cols: u16) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }
}

/// State shared with the reader thread
#[derive(Default)]
struct Shared {
    listener: Mutex<Option<Listener>>,
    // raw bytes so a character split across reads decodes once complete
    last_line: Mutex<Vec<u8>>,
    connected: AtomicBool,
}

impl Shared {
    /// Blocking read loop; returns on EOF or error
    fn pump(&self, mut reader: Box<dyn Read + Send>) {
        let mut buf = [0u8; 8192];

        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    tracing::debug!("PTY reader EOF");
                    break;
                }
                Ok(n) => {
                    tracing::trace!("PTY output: {} bytes", n);
                    self.dispatch(&buf[..n]);
                }
                Err(e) => {
                    // EIO is how Linux reports the child closing its side
                    tracing::debug!("PTY read ended: {}", e);
                    break;
                }
            }
        }

        self.connected.store(false, Ordering::SeqCst);
    }

    /// Hand a chunk to the subscribed listener
    ///
    /// The slot stays locked during the call, so a listener swapped out by
    /// [`swap_listener`](Self::swap_listener) never sees another chunk.
    fn dispatch(&self, data: &[u8]) {
        self.track_last_line(data);

        let Ok(slot) = self.listener.lock() else {
            tracing::warn!("Listener slot poisoned, dropping {} bytes", data.len());
            return;
        };
        if let Some(listener) = slot.as_ref() {
            listener(data);
        }
    }

    fn swap_listener(&self, listener: Option<Listener>) -> Option<Listener> {
        match self.listener.lock() {
            Ok(mut slot) => std::mem::replace(&mut *slot, listener),
            Err(_) => None,
        }
    }

    fn track_last_line(&self, data: &[u8]) {
        let Ok(mut line) = self.last_line.lock() else {
            return;
        };
        match data.iter().rposition(|&b| b == b'\n') {
            Some(i) => *line = data[i + 1..].to_vec(),
            None => line.extend_from_slice(data),
        }
        line.retain(|&b| b != b'\r');
    }

    fn last_line(&self) -> String {
        self.last_line
            .lock()
            .map(|l| String::from_utf8_lossy(&l).into_owned())
            .unwrap_or_default()
    }
}

/// REPL child process reachable as a [`ByteChannel`]
pub struct PtyChannel {
    _master: Mutex<Box<dyn MasterPty + Send>>,
    child: Mutex<Box<dyn Child + Send + Sync>>,
    writer: Mutex<Box<dyn Write + Send>>,
    shared: Arc<Shared>,
}

impl PtyChannel {
    /// Spawn the program and start reading its output
    pub fn spawn(config: &PtyConfig) -> Result<Arc<Self>> {
        let pty_system = native_pty_system();

        let pty_size = PtySize {
            rows: config.rows,
            cols: config.cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pty_pair = pty_system.openpty(pty_size).context("Failed to open PTY")?;

        let mut cmd = CommandBuilder::new(&config.program);
        cmd.args(&config.args);

        let child = pty_pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn {}", config.program))?;
        // only the child keeps the slave open, so its exit shows up as EOF
        drop(pty_pair.slave);

        let writer = pty_pair.master.take_writer().context("Failed to take PTY writer")?;
        let reader = pty_pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;

        let shared = Arc::new(Shared {
            connected: AtomicBool::new(true),
            ..Default::default()
        });

        // portable-pty reads block - keep them off the runtime threads
        let reader_shared = shared.clone();
        let pty_reader = tokio::task::spawn_blocking(move || reader_shared.pump(reader));
        tokio::spawn(async move {
            if let Err(e) = pty_reader.await {
                tracing::error!("PTY reader task panicked: {}", e);
            }
        });

        tracing::info!("Spawned {} {:?} on a PTY", config.program, config.args);

        Ok(Arc::new(Self {
            _master: Mutex::new(pty_pair.master),
            child: Mutex::new(child),
            writer: Mutex::new(writer),
            shared,
        }))
    }
}

impl ByteChannel for PtyChannel {
    fn write(&self, data: &[u8]) -> replsync_core::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| CoreError::Channel("PTY writer lock poisoned".into()))?;
        writer.write_all(data)?;
        writer.flush()?;
        tracing::trace!("Wrote {} bytes to PTY", data.len());
        Ok(())
    }

    fn subscribe(&self, listener: Option<Listener>) -> Option<Listener> {
        self.shared.swap_listener(listener)
    }

    fn is_connected(&self) -> bool {
        if !self.shared.connected.load(Ordering::SeqCst) {
            return false;
        }
        match self.child.lock() {
            Ok(mut child) => matches!(child.try_wait(), Ok(None)),
            Err(_) => false,
        }
    }

    fn last_displayed_line(&self) -> String {
        self.shared.last_line()
    }
}

impl Drop for PtyChannel {
    fn drop(&mut self) {
        if let Ok(child) = self.child.get_mut() {
            if let Err(e) = child.kill() {
                tracing::debug!("Failed to kill REPL process: {}", e);
            }
        }
    }
}

/// Listener that copies device output to stderr
pub fn echo_listener() -> Listener {
    Arc::new(|data: &[u8]| {
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(data);
        let _ = err.flush();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use replsync_core::channel::mock::recorder;
    use std::time::Duration;

    #[test]
    fn test_last_line_tracking() {
        let shared = Shared::default();
        shared.track_last_line(b"Espruino 2v19\r\n");
        assert_eq!(shared.last_line(), "");
        shared.track_last_line(b">");
        assert_eq!(shared.last_line(), ">");
        shared.track_last_line(b"foo");
        assert_eq!(shared.last_line(), ">foo");
        shared.track_last_line(b"\r\n=undefined\r\n>");
        assert_eq!(shared.last_line(), ">");
    }

    #[test]
    fn test_last_line_joins_split_characters() {
        let shared = Shared::default();
        shared.track_last_line(b"Temp 21\xC2");
        shared.track_last_line(b"\xB0C>");
        assert_eq!(shared.last_line(), "Temp 21\u{B0}C>");
    }

    #[test]
    fn test_swap_waits_for_delivery_in_progress() {
        let shared = Arc::new(Shared::default());
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let finished = Arc::new(AtomicBool::new(false));

        let flag = finished.clone();
        let listener: Listener = Arc::new(move |_: &[u8]| {
            let _ = started_tx.send(());
            std::thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
        });
        shared.swap_listener(Some(listener));

        let reader = {
            let shared = shared.clone();
            std::thread::spawn(move || shared.dispatch(b"chunk"))
        };
        started_rx.recv().unwrap();

        assert!(shared.swap_listener(None).is_some());
        assert!(finished.load(Ordering::SeqCst));
        reader.join().unwrap();
    }

    #[test]
    fn test_dispatch_reaches_listener() {
        let shared = Shared::default();
        let (listener, received) = recorder();
        *shared.listener.lock().unwrap() = Some(listener);

        shared.dispatch(b"hello\r\n>");

        assert_eq!(received.lock().unwrap().as_slice(), b"hello\r\n>");
        assert_eq!(shared.last_line(), ">");
    }

    #[test]
    fn test_pump_marks_disconnected_on_eof() {
        let shared = Shared {
            connected: AtomicBool::new(true),
            ..Default::default()
        };
        shared.pump(Box::new(std::io::Cursor::new(b"> ".to_vec())));
        assert!(!shared.connected.load(Ordering::SeqCst));
        assert_eq!(shared.last_line(), "> ");
    }

    #[test]
    fn test_pty_config() {
        let config = PtyConfig::new("espruino".into(), vec!["--board".into()]).with_size(40, 120);
        assert_eq!((config.rows, config.cols), (40, 120));
        assert_eq!(config.args, vec!["--board"]);
    }
}
