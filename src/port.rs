//! Capability surface consumed by a REPL shell.
//!
//! A shell drives the device through these calls only, so a websocket
//! session and a serial line are interchangeable behind `dyn ReplPort`.

use crate::error::Result;
use crate::webrepl::Transport;

/// A byte stream to a device REPL.
pub trait ReplPort: Send + Sync {
    /// Reads up to `size` bytes; see [`Transport::read`].
    fn read(&self, size: usize, blocking: bool) -> Vec<u8>;

    /// Writes `data`, returning the number of bytes accepted.
    ///
    /// # Errors
    ///
    /// Fails when the link to the device is gone.
    fn write(&self, data: &[u8]) -> Result<usize>;

    /// Number of bytes ready to read without waiting.
    fn in_waiting(&self) -> usize;

    /// Best-effort shutdown. Must be safe to call more than once.
    fn close(&self);

    /// Whether the link stays up across a soft reset of the device.
    fn survives_soft_reset(&self) -> bool;
}

impl ReplPort for Transport {
    fn read(&self, size: usize, blocking: bool) -> Vec<u8> {
        Transport::read(self, size, blocking)
    }

    fn write(&self, data: &[u8]) -> Result<usize> {
        Transport::write(self, data)
    }

    fn in_waiting(&self) -> usize {
        Transport::in_waiting(self)
    }

    fn close(&self) {
        Transport::close(self);
    }

    fn survives_soft_reset(&self) -> bool {
        Transport::survives_soft_reset(self)
    }
}
