//! Scripted in-memory sockets for tests.
//!
//! [`ScriptedConnector`] decides per connection attempt how the fake device
//! behaves, counts attempts and closed sockets, and records every payload
//! written to any of its sockets.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Connector, Socket, SocketEvent};

/// Device behaviour for one connection attempt.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Script {
    /// Connection refused.
    Refuse,
    /// Connect never completes.
    Hang,
    /// Send `prompt` on connect. After the first write, answer with `banner`,
    /// or deny access and close when `banner` is `None`. Later writes echo.
    Greet {
        prompt: &'static str,
        banner: Option<&'static str>,
    },
}

impl Script {
    pub(crate) fn accept() -> Self {
        Self::Greet {
            prompt: "Password: ",
            banner: Some("\r\nWebREPL connected\r\n>>> "),
        }
    }

    pub(crate) fn deny() -> Self {
        Self::Greet {
            prompt: "Password: ",
            banner: None,
        }
    }

    pub(crate) fn silent() -> Self {
        Self::Greet {
            prompt: "",
            banner: None,
        }
    }
}

type Plan = Box<dyn Fn(u32) -> Script + Send + Sync>;

pub(crate) struct ScriptedConnector {
    plan: Plan,
    attempts: AtomicU32,
    closed: Arc<AtomicU32>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    current: Mutex<Option<mpsc::UnboundedSender<SocketEvent>>>,
}

impl ScriptedConnector {
    /// Chooses a script from the 1-based attempt number.
    pub(crate) fn with_plan(plan: impl Fn(u32) -> Script + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            plan: Box::new(plan),
            attempts: AtomicU32::new(0),
            closed: Arc::new(AtomicU32::new(0)),
            sent: Arc::new(Mutex::new(Vec::new())),
            current: Mutex::new(None),
        })
    }

    pub(crate) fn always(script: Script) -> Arc<Self> {
        Self::with_plan(move |_| script)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn closed_sockets(&self) -> u32 {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    /// Delivers `event` on the most recently opened socket.
    pub(crate) fn inject(&self, event: SocketEvent) {
        if let Some(tx) = self.current.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    pub(crate) fn inject_text(&self, text: &str) {
        self.inject(SocketEvent::Message(text.as_bytes().to_vec()));
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _url: &Url) -> Result<Box<dyn Socket>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let (prompt, banner) = match (self.plan)(attempt) {
            Script::Refuse => return Err(Error::connection("connection refused")),
            Script::Hang => std::future::pending().await,
            Script::Greet { prompt, banner } => (prompt, banner),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if !prompt.is_empty() {
            let _ = tx.send(SocketEvent::Message(prompt.as_bytes().to_vec()));
        }
        *self.current.lock() = Some(tx.clone());

        Ok(Box::new(FakeSocket {
            tx,
            rx,
            banner,
            authenticated: false,
            sent: Arc::clone(&self.sent),
            closed: Arc::clone(&self.closed),
            open: true,
        }))
    }
}

struct FakeSocket {
    tx: mpsc::UnboundedSender<SocketEvent>,
    rx: mpsc::UnboundedReceiver<SocketEvent>,
    banner: Option<&'static str>,
    authenticated: bool,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<AtomicU32>,
    open: bool,
}

#[async_trait]
impl Socket for FakeSocket {
    async fn send(&mut self, payload: Vec<u8>) -> Result<()> {
        if !self.open {
            return Err(Error::ConnectionClosed);
        }
        self.sent.lock().push(payload.clone());

        if self.authenticated {
            let _ = self.tx.send(SocketEvent::Message(payload));
            return Ok(());
        }

        match self.banner {
            Some(banner) => {
                self.authenticated = true;
                let _ = self.tx.send(SocketEvent::Message(banner.as_bytes().to_vec()));
            }
            None => {
                let _ = self
                    .tx
                    .send(SocketEvent::Message(b"\r\nAccess denied\r\n".to_vec()));
                let _ = self.tx.send(SocketEvent::Closed);
            }
        }
        Ok(())
    }

    async fn next_event(&mut self) -> SocketEvent {
        // `self.tx` keeps the channel open, so this only ever pends
        self.rx.recv().await.unwrap_or(SocketEvent::Closed)
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
