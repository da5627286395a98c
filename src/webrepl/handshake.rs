//! WebREPL login exchange.
//!
//! ```text
//! device → "Password: "
//! client → "<password>\r"
//! device → "\r\nWebREPL connected\r\n>>> "
//! ```
//!
//! Both device messages are matched by substring within a 256 byte window.
//! Every attempt uses a fresh socket; a failed attempt detaches its socket
//! and discards whatever it left in the queue.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::core::{LinkState, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Marker in the device greeting.
pub const PASSWORD_PROMPT: &[u8] = b"Password:";

/// Marker in the device reply after a correct password.
pub const CONNECTED_BANNER: &[u8] = b"WebREPL connected";

/// Maximum bytes inspected for each marker.
pub const HANDSHAKE_WINDOW: usize = 256;

// ============================================================================
// HandshakeNegotiator
// ============================================================================

/// Drives the password exchange with bounded retry.
pub(crate) struct HandshakeNegotiator<'a> {
    password: &'a str,
    max_attempts: u32,
    timeout: Duration,
}

impl<'a> HandshakeNegotiator<'a> {
    pub(crate) const fn new(password: &'a str, max_attempts: u32, timeout: Duration) -> Self {
        Self {
            password,
            max_attempts,
            timeout,
        }
    }

    /// Authenticates `transport`, returning the number of sockets used.
    ///
    /// # Errors
    ///
    /// - [`Error::HandshakeExhausted`] if no attempt succeeded
    /// - [`Error::ConnectionClosed`] if the pump stopped mid-handshake
    pub(crate) fn negotiate(&self, transport: &Transport) -> Result<u32> {
        for attempt in 1..=self.max_attempts {
            transport.set_state(LinkState::Authenticating);
            debug!(attempt, url = %transport.url(), "Allocating new websocket");
            transport.attach()?;

            if self.login(transport) {
                return Ok(attempt);
            }

            warn!(attempt, max = self.max_attempts, "WebREPL handshake failed, retrying");
            transport.detach()?;
        }

        Err(Error::handshake_exhausted(
            transport.url().as_str(),
            self.max_attempts,
        ))
    }

    /// One prompt/password/banner exchange on the current socket.
    fn login(&self, transport: &Transport) -> bool {
        let greeting = transport.read_until(PASSWORD_PROMPT, HANDSHAKE_WINDOW, self.timeout);
        if !contains(&greeting, PASSWORD_PROMPT) {
            debug!(received = greeting.len(), "No password prompt");
            return false;
        }

        let mut reply = Vec::with_capacity(self.password.len() + 1);
        reply.extend_from_slice(self.password.as_bytes());
        reply.push(b'\r');

        if let Err(e) = transport.write(&reply) {
            debug!(error = %e, "Password not sent");
            return false;
        }

        let banner = transport.read_until(CONNECTED_BANNER, HANDSHAKE_WINDOW, self.timeout);
        if !contains(&banner, CONNECTED_BANNER) {
            debug!(received = banner.len(), "No connected banner");
            return false;
        }

        true
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns `true` if `needle` occurs anywhere in `haystack`.
pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

// ============================================================================
// Tests
// ============================================================================
