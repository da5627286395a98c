//! Transport tuning options.
//!
//! Timeouts and limits for the handshake and for steady-state reads.
//! The defaults match what a MicroPython WebREPL expects.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use webrepl_transport::TransportOptions;
//!
//! let options = TransportOptions::new()
//!     .with_attempts(3)
//!     .with_read_timeout(Duration::from_millis(500));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Port the WebREPL service listens on.
pub const DEFAULT_PORT: u16 = 8266;

/// Handshake attempts before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// Read timeout while waiting for the password prompt and banner.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Read timeout once authenticated.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause between the two shutdown writes.
pub const DEFAULT_SHUTDOWN_DELAY: Duration = Duration::from_millis(100);

/// How often an idle pump checks for a new socket.
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(100);

// ============================================================================
// TransportOptions
// ============================================================================

/// Timeouts and limits for a [`Transport`](crate::Transport).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// WebREPL port on the device.
    pub port: u16,

    /// Maximum number of sockets tried during the handshake.
    pub attempts: u32,

    /// Read timeout for the password prompt and the connected banner.
    pub handshake_timeout: Duration,

    /// Read timeout for [`Transport::read`](crate::Transport::read).
    pub read_timeout: Duration,

    /// Limit for opening a single socket.
    pub connect_timeout: Duration,

    /// Poll interval of the pump while no socket is attached.
    pub idle_poll: Duration,

    /// Pause between leaving raw mode and restarting the REPL on close.
    pub shutdown_delay: Duration,
}

// ============================================================================
// Constructors
// ============================================================================

impl TransportOptions {
    /// Creates options with WebREPL defaults.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            port: DEFAULT_PORT,
            attempts: DEFAULT_ATTEMPTS,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            idle_poll: DEFAULT_IDLE_POLL,
            shutdown_delay: DEFAULT_SHUTDOWN_DELAY,
        }
    }
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl TransportOptions {
    /// Sets the WebREPL port.
    #[inline]
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the number of handshake attempts.
    #[inline]
    #[must_use]
    pub const fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets the handshake read timeout.
    #[inline]
    #[must_use]
    pub const fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the steady-state read timeout.
    #[inline]
    #[must_use]
    pub const fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the per-socket connect timeout.
    #[inline]
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the idle poll interval of the pump.
    #[inline]
    #[must_use]
    pub const fn with_idle_poll(mut self, interval: Duration) -> Self {
        self.idle_poll = interval;
        self
    }

    /// Sets the pause between the two shutdown writes.
    #[inline]
    #[must_use]
    pub const fn with_shutdown_delay(mut self, delay: Duration) -> Self {
        self.shutdown_delay = delay;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TransportOptions {
    /// Checks that the options describe a usable transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero port, zero attempts, or a zero
    /// handshake/connect timeout or idle poll interval.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config("port must not be 0"));
        }
        if self.attempts == 0 {
            return Err(Error::config("at least one handshake attempt is required"));
        }
        if self.handshake_timeout.is_zero() {
            return Err(Error::config("handshake timeout must be positive"));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::config("connect timeout must be positive"));
        }
        if self.idle_poll.is_zero() {
            return Err(Error::config("idle poll interval must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
