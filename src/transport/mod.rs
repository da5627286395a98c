//! Socket plumbing underneath [`Transport`](crate::Transport).
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐                          ┌──────────────────┐
//! │ consumer thread    │                          │ pump thread      │
//! │                    │   PumpCommand channel    │ (tokio runtime)  │
//! │ Transport::write ──┼─────────────────────────►│                  │
//! │                    │                          │  Socket ◄──────► device
//! │ Transport::read ◄──┼──── ByteQueue + Condvar ◄┤                  │
//! └────────────────────┘                          └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `queue` | Byte FIFO with blocking pop |
//! | `socket` | `Connector` / `Socket` traits and the websocket implementation |
//! | `pump` | Background thread serving one socket at a time |

// ============================================================================
// Submodules
// ============================================================================

/// Byte FIFO shared by the pump and the consumer.
pub mod queue;

/// Socket traits and the `tokio-tungstenite` implementation.
pub mod socket;

/// Background thread that drains the socket into the queue.
pub mod pump;

// ============================================================================
// Re-exports
// ============================================================================

pub use pump::SocketPump;
pub use queue::ByteQueue;
pub use socket::{Connector, Socket, SocketEvent, WsConnector, WsSocket};
