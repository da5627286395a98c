//! Error types for the WebREPL transport.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webrepl_transport::{Result, Transport};
//!
//! fn example() -> Result<()> {
//!     let transport = Transport::open("192.168.4.1", "secret")?;
//!     transport.write(b"print(1)\r")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::HandshakeExhausted`] |
//! | Closed link | [`Error::NotConnected`], [`Error::ConnectionClosed`] |
//! | External | [`Error::Io`], [`Error::WebSocket`], [`Error::ChannelClosed`] |
//!
//! Socket faults observed by the background pump are never returned from
//! here; they only cut a pending read short.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::sync::mpsc::RecvError;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the builder is given an unusable host, port or option.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when a single socket cannot be opened.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Opening the socket took too long.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Every handshake attempt failed.
    ///
    /// Fatal to [`Transport::open`](crate::Transport::open): the transport is
    /// closed and never handed to the caller.
    #[error("WebREPL handshake with {url} failed after {attempts} attempts")]
    HandshakeExhausted {
        /// Endpoint that refused to authenticate.
        url: String,
        /// Number of sockets tried.
        attempts: u32,
    },

    // ========================================================================
    // Closed Link Errors
    // ========================================================================
    /// No socket is currently attached to the pump.
    ///
    /// Returned by writes issued while the device is unreachable.
    #[error("Not connected")]
    NotConnected,

    /// The transport has been closed.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a handshake exhausted error.
    #[inline]
    pub fn handshake_exhausted(url: impl Into<String>, attempts: u32) -> Self {
        Self::HandshakeExhausted {
            url: url.into(),
            attempts,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::HandshakeExhausted { .. }
                | Self::NotConnected
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the link is gone and writes cannot succeed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::ConnectionClosed | Self::ChannelClosed(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_handshake_exhausted_display() {
        let err = Error::handshake_exhausted("ws://10.0.0.2:8266/", 5);
        assert_eq!(
            err.to_string(),
            "WebREPL handshake with ws://10.0.0.2:8266/ failed after 5 attempts"
        );
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("host must not be empty");
        assert_eq!(err.to_string(), "Configuration error: host must not be empty");
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::connection_timeout(5000).is_timeout());
        assert!(!Error::connection("test").is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::handshake_exhausted("ws://x:8266/", 5).is_connection_error());
        assert!(Error::NotConnected.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_closed() {
        assert!(Error::NotConnected.is_closed());
        assert!(Error::ConnectionClosed.is_closed());
        assert!(!Error::connection_timeout(10).is_closed());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
