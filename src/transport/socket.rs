//! Socket abstraction over the websocket library.
//!
//! The pump only needs three things from a socket: send a payload, wait for
//! the next event, and close. [`Connector`] opens a fresh [`Socket`] for every
//! handshake attempt.
//!
//! [`WsConnector`] is the production implementation backed by
//! `tokio-tungstenite`. Tests substitute scripted fakes through the same
//! traits.
//!
//! # Cancel Safety
//!
//! [`Socket::next_event`] is polled inside `tokio::select!` next to the
//! command channel, so implementations must not lose data when the future is
//! dropped before completion.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// SocketEvent
// ============================================================================

/// Event delivered by a live socket.
#[derive(Debug)]
pub enum SocketEvent {
    /// Payload bytes from a text or binary frame.
    Message(Vec<u8>),
    /// Transport-level failure. The socket is unusable afterwards.
    Error(Error),
    /// Peer closed the connection or the stream ended.
    Closed,
}

// ============================================================================
// Traits
// ============================================================================

/// A connected websocket owned by the pump.
#[async_trait]
pub trait Socket: Send + 'static {
    /// Sends one payload verbatim.
    async fn send(&mut self, payload: Vec<u8>) -> Result<()>;

    /// Waits for the next event.
    ///
    /// Must be cancel-safe (see module docs).
    async fn next_event(&mut self) -> SocketEvent;

    /// Closes the socket. Safe to call on an already closed socket.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for fresh sockets, called once per handshake attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a new socket to `url`.
    async fn connect(&self, url: &Url) -> Result<Box<dyn Socket>>;
}

// ============================================================================
// WsConnector
// ============================================================================

/// Opens plain `ws://` connections with `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    /// Creates a connector that gives up after `connect_timeout`.
    #[inline]
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Socket>> {
        let (stream, response) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| Error::connection_timeout(saturating_millis(self.connect_timeout)))?
            .map_err(|e| Error::connection(format!("WebSocket connect to {url} failed: {e}")))?;

        debug!(%url, status = %response.status(), "WebSocket opened");

        Ok(Box::new(WsSocket {
            stream,
            closed: false,
        }))
    }
}

/// Milliseconds in `duration`, capped at `u64::MAX`.
fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// WsSocket
// ============================================================================

/// A `tokio-tungstenite` client stream.
pub struct WsSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl Socket for WsSocket {
    async fn send(&mut self, payload: Vec<u8>) -> Result<()> {
        // WebREPL reads console input from text frames only.
        let text = String::from_utf8_lossy(&payload).into_owned();
        self.stream.send(Message::Text(text.into())).await?;
        trace!(len = payload.len(), "Payload sent");
        Ok(())
    }

    async fn next_event(&mut self) -> SocketEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return SocketEvent::Message(text.as_bytes().to_vec());
                }

                Some(Ok(Message::Binary(data))) => {
                    return SocketEvent::Message(data.to_vec());
                }

                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "WebSocket closed by remote");
                    self.closed = true;
                    return SocketEvent::Closed;
                }

                Some(Err(e)) => return SocketEvent::Error(Error::WebSocket(e)),

                None => {
                    self.closed = true;
                    return SocketEvent::Closed;
                }

                // Ping/Pong are answered by tungstenite itself
                Some(Ok(_)) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.close(None).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
