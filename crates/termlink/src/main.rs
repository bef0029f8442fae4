//! Termlink CLI - Entry Point
//!
//! Minimal stand-in for a presentation layer: opens one session against a
//! terminal host and bridges stdin/stdout to it. Reconnection is deliberately
//! not attempted; run the command again for a fresh session.

use anyhow::Result;
use clap::Parser;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use termlink::{
    run_session, AdapterEvent, Config, Emulator, Geometry, NullListener, SessionClient,
};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Open a terminal session against a termlink host
#[derive(Debug, Parser)]
#[command(name = "termlink", version)]
struct Args {
    /// WebSocket endpoint of the terminal host (overrides config)
    #[arg(long)]
    endpoint: Option<String>,

    /// Owner label folded into the requested session name
    #[arg(long, default_value = "termlink")]
    owner: String,

    /// Shell type to spawn on the host (overrides config)
    #[arg(long)]
    shell: Option<String>,

    /// Working directory for the spawned shell (overrides config)
    #[arg(long)]
    working_dir: Option<String>,
}

/// Writes session output straight to stdout.
///
/// Geometry is fixed: this driver has no resize source of its own, so the
/// settle-delayed first resize is the only one ever sent.
struct StdoutEmulator {
    out: Mutex<std::io::Stdout>,
    geometry: Geometry,
}

impl Emulator for StdoutEmulator {
    fn write(&self, bytes: &[u8]) {
        let mut out = self.out.lock();
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }

    fn geometry(&self) -> Geometry {
        self.geometry
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("termlink=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::load()?;
    if let Some(endpoint) = args.endpoint {
        config.host.endpoint = endpoint;
    }
    if let Some(shell) = args.shell {
        config.session.terminal_type = shell;
    }
    if let Some(working_dir) = args.working_dir {
        config.session.working_dir = working_dir;
    }

    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    let (adapter_tx, adapter_rx) = mpsc::unbounded_channel();

    let emulator = Arc::new(StdoutEmulator {
        out: Mutex::new(std::io::stdout()),
        geometry: Geometry { cols: 120, rows: 32 },
    });
    let mut client = SessionClient::new(
        config.session_options(&args.owner),
        outbox_tx,
        emulator,
        Arc::new(NullListener),
    );

    // stdin → user input events
    let input_tx = adapter_tx.clone();
    tokio::spawn(async move {
        let mut stdin = tokio::io::stdin();
        let mut buf = [0u8; 1024];
        loop {
            match stdin.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if input_tx.send(AdapterEvent::UserInput(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
            }
        }
        debug!("stdin closed");
    });

    // Ctrl-C → teardown
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = adapter_tx.send(AdapterEvent::Shutdown);
        }
    });

    run_session(&mut client, &config.host.endpoint, outbox_rx, adapter_rx).await?;
    Ok(())
}
