//! WebREPL session: handshake, lifecycle and the public [`Transport`].
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::open` / `TransportBuilder::open` - start the pump thread
//! 2. `HandshakeNegotiator` - fresh socket, `Password:` prompt, password,
//!    `WebREPL connected` banner; up to 5 attempts
//! 3. `Transport::read` / `Transport::write` - steady state
//! 4. `Transport::close` - leave raw REPL, restart WebREPL, join the pump
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent configuration and validation |
//! | `core` | The `Transport` type |
//! | `handshake` | Password exchange with bounded retry |
//! | `options` | Timeouts and limits |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for transport configuration.
pub mod builder;

/// The transport and its lifecycle state.
pub mod core;

/// Password exchange.
pub mod handshake;

/// Timeouts and limits.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::TransportBuilder;
pub use self::core::{LinkState, Transport};
pub use options::{DEFAULT_PORT, TransportOptions};
