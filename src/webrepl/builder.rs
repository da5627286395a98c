//! Builder pattern for transport configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use webrepl_transport::Transport;
//!
//! # fn example() -> webrepl_transport::Result<()> {
//! let transport = Transport::builder()
//!     .host("192.168.4.1")
//!     .password("micropython")
//!     .read_timeout(Duration::from_millis(500))
//!     .open()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Connector, WsConnector};

use super::core::Transport;
use super::options::TransportOptions;

// ============================================================================
// TransportBuilder
// ============================================================================

/// Builder for configuring and opening a [`Transport`].
///
/// Use [`Transport::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct TransportBuilder {
    /// Device host name or address.
    host: Option<String>,
    /// WebREPL password.
    password: Option<String>,
    /// Timeouts and limits.
    options: TransportOptions,
    /// Socket factory, defaults to [`WsConnector`].
    connector: Option<Arc<dyn Connector>>,
}

impl fmt::Debug for TransportBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportBuilder")
            .field("host", &self.host)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("options", &self.options)
            .field("custom_connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// TransportBuilder Implementation
// ============================================================================

impl TransportBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the device host name or IP address.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the WebREPL password.
    #[inline]
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the WebREPL port (default 8266).
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }

    /// Sets the number of handshake attempts (default 5).
    #[inline]
    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.options.attempts = attempts;
        self
    }

    /// Sets the steady-state read timeout (default 1s).
    #[inline]
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.options.read_timeout = timeout;
        self
    }

    /// Sets the handshake read timeout (default 5s).
    #[inline]
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.options.handshake_timeout = timeout;
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: TransportOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses a custom socket factory instead of the websocket client.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Validates the configuration, connects and authenticates.
    ///
    /// Blocks the calling thread for the whole handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if host or password is missing, or options are invalid
    /// - [`Error::HandshakeExhausted`] if no attempt authenticated
    /// - [`Error::Io`] if the pump thread cannot be started
    pub fn open(self) -> Result<Transport> {
        self.options.validate()?;
        let url = self.endpoint()?;
        let password = self.password.ok_or_else(|| {
            Error::config(
                "WebREPL password is required. Use .password() to set it.\n\
                 Example: Transport::builder().password(\"micropython\")",
            )
        })?;

        let connect_timeout = self.options.connect_timeout;
        let connector = self.connector.unwrap_or_else(|| {
            Arc::new(WsConnector::new(connect_timeout)) as Arc<dyn Connector>
        });

        Transport::connect(url, &password, self.options, connector)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TransportBuilder {
    /// Builds `ws://<host>:<port>` from the configured host.
    fn endpoint(&self) -> Result<Url> {
        let host = self.host.as_deref().map(str::trim).unwrap_or_default();
        if host.is_empty() {
            return Err(Error::config(
                "Device host is required. Use .host() to set it.\n\
                 Example: Transport::builder().host(\"192.168.4.1\")",
            ));
        }

        if let Some((name, port)) = split_port(host) {
            return Err(Error::config(format!(
                "Device host {host:?} includes a port. Set the port with .port() instead.\n\
                 Example: Transport::builder().host({name:?}).port({port})"
            )));
        }

        // Bare IPv6 literals need brackets inside a URL
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_string()
        };

        let url = Url::parse(&format!("ws://{host}:{}", self.options.port))
            .map_err(|e| Error::config(format!("Invalid device host {host:?}: {e}")))?;

        if url.path() != "/" || url.query().is_some() || !url.username().is_empty() {
            return Err(Error::config(format!(
                "Device host must be a bare host name or address, got {host:?}"
            )));
        }

        Ok(url)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Splits a trailing `:port` off `host`, as in `"esp.local:8300"` or
/// `"[fe80::1]:8300"`. Bare IPv6 literals have no port to split.
fn split_port(host: &str) -> Option<(&str, &str)> {
    let (name, port) = host.rsplit_once(':')?;
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let bracketed = name.starts_with('[') && name.ends_with(']');
    if name.contains(':') && !bracketed {
        return None;
    }

    Some((name, port))
}

// ============================================================================
// Tests
// ============================================================================
