//! Background socket pump.
//!
//! The pump owns one dedicated OS thread for the whole lifetime of a
//! [`Transport`](crate::Transport). The thread runs a current-thread tokio
//! runtime and alternates between two states:
//!
//! - **waiting**: no socket assigned; poll the command channel briefly.
//! - **serving**: a socket is assigned; forward its events into the
//!   [`ByteQueue`] until it closes, errors, or is detached.
//!
//! The consumer never touches the socket directly. It sends commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `Attach` | Open a fresh socket, replacing any current one |
//! | `Send` | Write a payload to the current socket |
//! | `Detach` | Close the current socket, acknowledge when idle |
//! | `Shutdown` | Close everything and leave the loop |
//!
//! Socket faults never escape the pump: they are logged and turned into a
//! queue interrupt so a blocked reader returns early.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::mpsc::{SyncSender, sync_channel};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Builder as RuntimeBuilder;
use tokio::sync::{Notify, mpsc};
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::queue::ByteQueue;
use super::socket::{Connector, Socket, SocketEvent};

// ============================================================================
// Constants
// ============================================================================

/// Name of the pump thread.
const THREAD_NAME: &str = "webrepl-pump";

// ============================================================================
// PumpCommand
// ============================================================================

/// Internal commands for the pump loop.
enum PumpCommand {
    /// Open a fresh socket.
    Attach,
    /// Write a payload to the current socket.
    Send(Vec<u8>),
    /// Drop the current socket; acknowledged once the pump is idle.
    ///
    /// The ack channel is a std channel so the consumer can wait on it from
    /// any thread, including one driven by an async runtime.
    Detach(SyncSender<()>),
    /// Leave the loop.
    Shutdown,
}

/// Why a serving session ended.
enum ServeOutcome {
    /// Socket gone; fall back to waiting.
    Idle,
    /// A new socket was requested.
    Replace,
    /// Consumer asked to detach.
    Detached(SyncSender<()>),
}

/// One turn of the serving loop.
enum Step {
    Event(SocketEvent),
    Command(Option<PumpCommand>),
}

// ============================================================================
// PumpShared
// ============================================================================

/// State visible to both the consumer and the pump thread.
struct PumpShared {
    /// Cleared once by shutdown; the loop exits when it observes `false`.
    active: AtomicBool,
    /// `true` while a connected socket is being served.
    live: AtomicBool,
    /// Cancels an in-flight connect on shutdown.
    stop: Notify,
    queue: Arc<ByteQueue>,
}

// ============================================================================
// SocketPump
// ============================================================================

/// Handle to the background pump thread.
pub struct SocketPump {
    command_tx: mpsc::UnboundedSender<PumpCommand>,
    shared: Arc<PumpShared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SocketPump {
    /// Starts the pump thread in the waiting state.
    ///
    /// No socket exists until [`attach`](Self::attach) is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the runtime or the thread cannot be created.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        url: Url,
        queue: Arc<ByteQueue>,
        idle_poll: Duration,
    ) -> Result<Self> {
        let runtime = RuntimeBuilder::new_current_thread().enable_all().build()?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(PumpShared {
            active: AtomicBool::new(true),
            live: AtomicBool::new(false),
            stop: Notify::new(),
            queue,
        });

        let worker = PumpWorker {
            connector,
            url,
            command_rx,
            shared: Arc::clone(&shared),
            idle_poll,
        };

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(worker.run()))?;

        Ok(Self {
            command_tx,
            shared,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Asks the pump to open a fresh socket, replacing the current one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the pump has shut down.
    pub fn attach(&self) -> Result<()> {
        self.command(PumpCommand::Attach)
    }

    /// Queues `payload` for the current socket.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no socket is being served
    /// - [`Error::ConnectionClosed`] if the pump has shut down
    pub fn send(&self, payload: Vec<u8>) -> Result<()> {
        if !self.is_live() {
            return Err(Error::NotConnected);
        }
        self.command(PumpCommand::Send(payload))
    }

    /// Closes the current socket and waits until the pump is idle.
    ///
    /// Once this returns no further bytes from the old socket can reach the
    /// queue.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the pump has shut down
    /// - [`Error::ChannelClosed`] if the pump exits before acknowledging
    pub fn detach(&self) -> Result<()> {
        let (ack_tx, ack_rx) = sync_channel(1);
        self.command(PumpCommand::Detach(ack_tx))?;
        ack_rx.recv()?;
        Ok(())
    }

    /// Returns `true` while a connected socket is being served.
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.shared.live.load(Ordering::Acquire)
    }

    /// Returns `true` until [`shutdown`](Self::shutdown) is called.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Returns `true` once the pump thread has been joined.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.thread.lock().is_none()
    }

    /// Stops the pump and joins its thread.
    ///
    /// Idempotent. Closes the current socket and releases any blocked
    /// reader.
    pub fn shutdown(&self) {
        self.shared.active.store(false, Ordering::Release);
        let _ = self.command_tx.send(PumpCommand::Shutdown);
        self.shared.stop.notify_one();
        self.shared.queue.interrupt();

        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Pump thread panicked");
            }
            debug!("Pump thread joined");
        }
    }

    fn command(&self, command: PumpCommand) -> Result<()> {
        if !self.is_active() {
            return Err(Error::ConnectionClosed);
        }
        self.command_tx
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }
}

impl Drop for SocketPump {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// PumpWorker
// ============================================================================

/// State owned by the pump thread.
struct PumpWorker {
    connector: Arc<dyn Connector>,
    url: Url,
    command_rx: mpsc::UnboundedReceiver<PumpCommand>,
    shared: Arc<PumpShared>,
    idle_poll: Duration,
}

impl PumpWorker {
    async fn run(mut self) {
        debug!(url = %self.url, "Pump started");

        let mut assigned = false;
        while self.shared.active.load(Ordering::Acquire) {
            assigned = if assigned {
                self.serve().await
            } else {
                self.wait().await
            };
        }

        debug!("Pump terminated");
    }

    /// Waiting state. Returns `true` when a socket has been requested.
    async fn wait(&mut self) -> bool {
        match timeout(self.idle_poll, self.command_rx.recv()).await {
            Err(_) => false,

            Ok(Some(PumpCommand::Attach)) => true,

            Ok(Some(PumpCommand::Send(payload))) => {
                warn!(len = payload.len(), "No socket attached, dropping write");
                false
            }

            Ok(Some(PumpCommand::Detach(ack))) => {
                let _ = ack.try_send(());
                false
            }

            Ok(Some(PumpCommand::Shutdown)) => false,

            Ok(None) => {
                debug!("Command channel closed");
                self.shared.active.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Serving state. Returns `true` when a replacement socket was requested.
    async fn serve(&mut self) -> bool {
        let connected = tokio::select! {
            result = self.connector.connect(&self.url) => result,
            () = self.shared.stop.notified() => return false,
        };

        let mut socket = match connected {
            Ok(socket) => socket,
            Err(e) => {
                error!(url = %self.url, error = %e, "WebSocket error");
                self.shared.queue.interrupt();
                return false;
            }
        };

        self.shared.live.store(true, Ordering::Release);
        debug!(url = %self.url, "Entering serving state");

        let outcome = self.pump_events(&mut socket).await;

        self.shared.live.store(false, Ordering::Release);
        if let Err(e) = socket.close().await {
            debug!(error = %e, "Socket close failed");
        }
        self.shared.queue.interrupt();
        debug!("Exiting serving state");

        match outcome {
            ServeOutcome::Idle => false,
            ServeOutcome::Replace => true,
            ServeOutcome::Detached(ack) => {
                let _ = ack.try_send(());
                false
            }
        }
    }

    async fn pump_events(&mut self, socket: &mut Box<dyn Socket>) -> ServeOutcome {
        loop {
            let step = tokio::select! {
                event = socket.next_event() => Step::Event(event),
                command = self.command_rx.recv() => Step::Command(command),
            };

            match step {
                Step::Event(SocketEvent::Message(payload)) => {
                    trace!(len = payload.len(), "Message received");
                    self.shared.queue.push(&payload);
                }

                Step::Event(SocketEvent::Error(e)) => {
                    error!(error = %e, "WebSocket error");
                    self.shared.queue.interrupt();
                    return ServeOutcome::Idle;
                }

                Step::Event(SocketEvent::Closed) => {
                    info!(url = %self.url, "WebSocket closed");
                    return ServeOutcome::Idle;
                }

                Step::Command(Some(PumpCommand::Send(payload))) => {
                    if let Err(e) = socket.send(payload).await {
                        error!(error = %e, "WebSocket error");
                        self.shared.queue.interrupt();
                        return ServeOutcome::Idle;
                    }
                }

                Step::Command(Some(PumpCommand::Attach)) => return ServeOutcome::Replace,

                Step::Command(Some(PumpCommand::Detach(ack))) => {
                    return ServeOutcome::Detached(ack);
                }

                Step::Command(Some(PumpCommand::Shutdown)) => return ServeOutcome::Idle,

                Step::Command(None) => {
                    self.shared.active.store(false, Ordering::Release);
                    return ServeOutcome::Idle;
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
