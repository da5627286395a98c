//! Serial-port style transport over WebREPL.
//!
//! The [`Transport`] composes a [`SocketPump`] (background thread owning the
//! websocket) with a [`ByteQueue`] (bytes waiting for the consumer). All
//! public methods are synchronous and meant to be called from one consumer
//! thread. They block that thread, so async callers should prefer
//! `spawn_blocking`, but calling them from a runtime worker is not an error.
//!
//! # Example
//!
//! ```no_run
//! use webrepl_transport::Transport;
//!
//! # fn example() -> webrepl_transport::Result<()> {
//! let transport = Transport::open("192.168.4.1", "micropython")?;
//!
//! transport.write(b"print('hello')\r")?;
//! let output = transport.read(64, true);
//! println!("{}", String::from_utf8_lossy(&output));
//!
//! transport.close();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::{ByteQueue, Connector, SocketPump};

use super::builder::TransportBuilder;
use super::handshake::{HandshakeNegotiator, contains};
use super::options::TransportOptions;

// ============================================================================
// Constants
// ============================================================================

/// Ctrl-B, leaves raw REPL mode.
const EXIT_RAW_REPL: &[u8] = b"\x02";

/// Restarts the WebREPL service so the next client finds a clean prompt.
const RESTART_WEBREPL: &[u8] = b"import webrepl; webrepl.stop(); webrepl.start()\r";

// ============================================================================
// LinkState
// ============================================================================

/// Lifecycle of a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Pump started, no socket yet.
    Connecting,
    /// A handshake attempt is in progress.
    Authenticating,
    /// Authenticated; serving reads and writes.
    Connected,
    /// Shutdown sequence running.
    Closing,
    /// Pump stopped and joined.
    Closed,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Transport
// ============================================================================

/// An authenticated WebREPL session behaving like a serial port.
///
/// Created by [`Transport::open`] or [`Transport::builder`]. Dropping the
/// transport closes it.
pub struct Transport {
    /// Identifier used in log output.
    id: Uuid,
    /// `ws://<host>:<port>/`.
    url: Url,
    /// Timeouts and limits.
    options: TransportOptions,
    /// Bytes received and not yet read.
    queue: Arc<ByteQueue>,
    /// Background socket thread.
    pump: SocketPump,
    /// Lifecycle state.
    state: Mutex<LinkState>,
    /// Sockets used until authentication succeeded.
    attempts: u32,
}

// ============================================================================
// Transport - Constructors
// ============================================================================

impl Transport {
    /// Connects to `ws://<host>:8266` and logs in with `password`.
    ///
    /// # Errors
    ///
    /// - [`Error::HandshakeExhausted`] if all 5 attempts failed
    /// - [`Error::Config`] if `host` is not a valid host
    pub fn open(host: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        Self::builder().host(host).password(password).open()
    }

    /// Creates a builder for a customised transport.
    #[inline]
    #[must_use]
    pub fn builder() -> TransportBuilder {
        TransportBuilder::new()
    }

    /// Starts the pump and runs the handshake.
    ///
    /// On failure the transport is closed before the error is returned.
    pub(crate) fn connect(
        url: Url,
        password: &str,
        options: TransportOptions,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let queue = Arc::new(ByteQueue::new());
        let pump = SocketPump::spawn(connector, url.clone(), Arc::clone(&queue), options.idle_poll)?;

        let mut transport = Self {
            id: Uuid::new_v4(),
            url,
            options,
            queue,
            pump,
            state: Mutex::new(LinkState::Connecting),
            attempts: 0,
        };

        debug!(id = %transport.id, url = %transport.url, "Transport created");

        let negotiator =
            HandshakeNegotiator::new(password, options.attempts, options.handshake_timeout);

        match negotiator.negotiate(&transport) {
            Ok(attempts) => {
                transport.attempts = attempts;
                transport.set_state(LinkState::Connected);
                info!(
                    id = %transport.id,
                    url = %transport.url,
                    attempts,
                    "WebREPL connected"
                );
                Ok(transport)
            }
            Err(e) => {
                transport.close();
                Err(e)
            }
        }
    }
}

// ============================================================================
// Transport - Public API
// ============================================================================

impl Transport {
    /// Reads up to `size` bytes using the steady-state timeout.
    ///
    /// See [`read_with`](Self::read_with).
    #[inline]
    pub fn read(&self, size: usize, blocking: bool) -> Vec<u8> {
        self.read_with(size, blocking, self.options.read_timeout)
    }

    /// Reads up to `size` bytes, waiting at most `timeout`.
    ///
    /// With `blocking`, waits for data until `size` bytes are collected or
    /// the timeout elapses. A socket error or close cuts the wait short.
    /// Without `blocking`, returns whatever is queued right now.
    ///
    /// Never fails; a short or empty result means nothing more arrived in
    /// time, which after a socket fault may also mean the link is down.
    pub fn read_with(&self, size: usize, blocking: bool, timeout: Duration) -> Vec<u8> {
        let deadline = deadline_after(timeout);
        let mut data = Vec::with_capacity(size.min(4096));

        while data.len() < size {
            let wanted = size - data.len();
            let chunk = if blocking {
                self.queue.pop_before(wanted, deadline)
            } else {
                self.queue.pop_now(wanted)
            };

            if chunk.is_empty() {
                break;
            }
            data.extend_from_slice(&chunk);
        }

        data
    }

    /// Writes `data` verbatim to the device.
    ///
    /// Returns `data.len()`; delivery is not confirmed.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the socket is gone
    /// - [`Error::ConnectionClosed`] if the transport was closed
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        if matches!(self.state(), LinkState::Closing | LinkState::Closed) {
            return Err(Error::ConnectionClosed);
        }
        self.pump.send(data.to_vec())?;
        Ok(data.len())
    }

    /// Returns the number of bytes ready to read.
    #[inline]
    #[must_use]
    pub fn in_waiting(&self) -> usize {
        self.queue.len()
    }

    /// Shuts the session down.
    ///
    /// Leaves raw REPL mode, restarts the device's WebREPL service, closes
    /// the socket, releases blocked readers and joins the pump thread.
    /// The device-facing steps ignore failures. Calling it again is a no-op.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if matches!(*state, LinkState::Closing | LinkState::Closed) {
                return;
            }
            *state = LinkState::Closing;
        }

        debug!(id = %self.id, "Closing transport");

        if self.pump.is_live() {
            self.shutdown_step("exit raw REPL", EXIT_RAW_REPL);
            thread::sleep(self.options.shutdown_delay);
            self.shutdown_step("restart WebREPL", RESTART_WEBREPL);
        }

        self.pump.shutdown();
        self.set_state(LinkState::Closed);

        info!(id = %self.id, url = %self.url, "Transport closed");
    }

    /// Always `false`: a soft reset of the device drops the websocket.
    #[inline]
    #[must_use]
    pub const fn survives_soft_reset(&self) -> bool {
        false
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> LinkState {
        *self.state.lock()
    }

    /// Returns `true` while authenticated and the socket is up.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected && self.pump.is_live()
    }

    /// Returns the websocket endpoint.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the identifier used in log output.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns how many sockets the handshake needed.
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the options this transport was opened with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }
}

// ============================================================================
// Transport - Handshake Support
// ============================================================================

impl Transport {
    pub(crate) fn set_state(&self, state: LinkState) {
        let previous = std::mem::replace(&mut *self.state.lock(), state);
        if previous != state {
            debug!(id = %self.id, from = %previous, to = %state, "State changed");
        }
    }

    /// Asks the pump for a fresh socket.
    pub(crate) fn attach(&self) -> Result<()> {
        self.pump.attach()
    }

    /// Drops the current socket and everything it delivered.
    pub(crate) fn detach(&self) -> Result<()> {
        self.pump.detach()?;
        self.queue.reset();
        Ok(())
    }

    /// Collects up to `max` bytes, stopping early once `needle` is present.
    pub(crate) fn read_until(&self, needle: &[u8], max: usize, timeout: Duration) -> Vec<u8> {
        let deadline = deadline_after(timeout);
        let mut data = Vec::with_capacity(max);

        while data.len() < max {
            let chunk = self.queue.pop_before(max - data.len(), deadline);
            if chunk.is_empty() {
                break;
            }
            data.extend_from_slice(&chunk);
            if contains(&data, needle) {
                break;
            }
        }

        data
    }

    fn shutdown_step(&self, step: &str, payload: &[u8]) {
        if let Err(e) = self.pump.send(payload.to_vec()) {
            debug!(id = %self.id, step, error = %e, "Ignoring failed shutdown step");
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Deadline `timeout` from now, or `None` when it lies beyond what
/// [`Instant`] can represent.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("state", &self.state())
            .field("attempts", &self.attempts)
            .field("in_waiting", &self.in_waiting())
            .finish_non_exhaustive()
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Tests
// ============================================================================
