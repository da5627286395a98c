//! Run one expression on a MicroPython board over WebREPL.
//!
//! Usage:
//!
//! ```text
//! cargo run --example webrepl_exec -- <host> <password> [expression] [--debug]
//! ```

use std::time::Duration;

use anyhow::{Context, bail};
use tracing::error;
use tracing_subscriber::EnvFilter;
use webrepl_transport::{ReplPort, Transport};

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    host: String,
    password: String,
    expression: String,
    debug: bool,
}

impl Args {
    /// Parse command-line arguments.
    fn parse() -> Option<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let debug = args.iter().any(|a| a == "--debug");
        let mut positional = args.into_iter().filter(|a| !a.starts_with("--"));

        Some(Self {
            host: positional.next()?,
            password: positional.next()?,
            expression: positional.next().unwrap_or_else(|| "import sys; sys.implementation".into()),
            debug,
        })
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "webrepl_transport=debug"
    } else {
        "webrepl_transport=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Reads until the device goes quiet for one read timeout.
fn drain(port: &dyn ReplPort) -> Vec<u8> {
    let mut output = Vec::new();
    loop {
        let chunk = port.read(256, true);
        if chunk.is_empty() {
            return output;
        }
        output.extend(chunk);
    }
}

fn main() -> anyhow::Result<()> {
    let Some(args) = Args::parse() else {
        bail!("usage: webrepl_exec <host> <password> [expression] [--debug]");
    };

    init_logging(args.debug);

    let transport = Transport::builder()
        .host(&args.host)
        .password(&args.password)
        .read_timeout(Duration::from_millis(500))
        .open()
        .with_context(|| format!("could not open WebREPL on {}", args.host))?;

    let port: &dyn ReplPort = &transport;
    let command = format!("{}\r", args.expression);

    if let Err(e) = port.write(command.as_bytes()) {
        error!(error = %e, "Write failed");
        port.close();
        return Err(e).context("sending expression");
    }

    let output = drain(port);
    print!("{}", String::from_utf8_lossy(&output));
    println!();

    port.close();
    Ok(())
}
