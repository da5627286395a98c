//! WebREPL Transport - serial-port style access to a MicroPython REPL over websocket.
//!
//! This library connects to the WebREPL service of a MicroPython board,
//! logs in, and then behaves like a serial line: blocking reads with a
//! timeout, fire-and-forget writes, and a clean shutdown.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌──────────────────┐
//! │  Consumer (shell)    │                         │  Device          │
//! │                      │        WebSocket        │                  │
//! │  Transport           │◄───────────────────────►│  WebREPL :8266   │
//! │  → SocketPump thread │                         │                  │
//! │  → ByteQueue         │                         │                  │
//! └──────────────────────┘                         └──────────────────┘
//! ```
//!
//! Key design principles:
//!
//! - One persistent pump thread per [`Transport`], started before any socket
//! - Every handshake attempt uses a fresh socket (5 attempts by default)
//! - Socket faults never raise; they cut a pending read short
//! - `close()` always deactivates and joins, whatever the device does
//!
//! # Quick Start
//!
//! ```no_run
//! use webrepl_transport::{Result, Transport};
//!
//! fn main() -> Result<()> {
//!     let transport = Transport::open("192.168.4.1", "micropython")?;
//!
//!     transport.write(b"1 + 1\r")?;
//!     let output = transport.read(256, true);
//!     println!("{}", String::from_utf8_lossy(&output));
//!
//!     transport.close();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`webrepl`] | [`Transport`], builder, options, handshake |
//! | [`transport`] | Socket traits, pump thread, byte queue |
//! | [`port`] | [`ReplPort`] capability trait |
//! | [`error`] | Error types and [`Result`] alias |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Capability trait for REPL shells.
pub mod port;

/// Socket plumbing: byte queue, socket traits, background pump.
pub mod transport;

/// WebREPL session: the public [`Transport`] and its configuration.
pub mod webrepl;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Capability trait
pub use port::ReplPort;

// Socket seam
pub use transport::{Connector, Socket, SocketEvent, WsConnector};

// Session types
pub use webrepl::{DEFAULT_PORT, LinkState, Transport, TransportBuilder, TransportOptions};
