//! silt server
//!
//! Accepts TCP connections and hands each one to a detached worker thread
//! that owns the whole query pipeline for the connection's lifetime. The
//! pipeline is synchronous; the only concurrency is between connections,
//! which share the storage engine.

use std::net::{TcpListener, TcpStream};
use std::thread;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use silt_core::executor::Executor;
use silt_core::inference::DisabledPredictor;
use silt_core::storage::MemoryEngine;
use silt_core::wire;
use silt_core::Error;

/// The silt database server.
#[derive(Parser)]
#[command(name = "silt-server", version, about, long_about = None)]
struct Cli {
    /// TCP port to listen on.
    port: u16,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let engine = MemoryEngine::new();
    let listener = TcpListener::bind(("0.0.0.0", cli.port))
        .with_context(|| format!("cannot listen on port {}", cli.port))?;
    info!(port = cli.port, "listening");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let engine = engine.clone();
                thread::spawn(move || {
                    if let Err(e) = handle_connection(stream, engine) {
                        error!(error = %e, "connection handler failed");
                    }
                });
            }
            Err(e) => error!(error = %e, "accept failed"),
        }
    }

    Ok(())
}

/// Runs one session: reads query frames, executes them, and streams the
/// results back, ending every command sequence with a ready frame.
fn handle_connection(stream: TcpStream, engine: MemoryEngine) -> silt_core::Result<()> {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".into());
    info!(%peer, "client connected");

    let mut reader = stream
        .try_clone()
        .map_err(|e| Error::Protocol(format!("cannot clone stream: {e}")))?;
    let mut writer = stream;
    let mut session = Executor::new(engine, DisabledPredictor);

    loop {
        let Some(frame) = wire::read_frame(&mut reader)? else {
            break;
        };
        if frame.tag != wire::MSG_QUERY {
            return Err(Error::Protocol(format!(
                "unexpected message type {:?}",
                frame.tag as char
            )));
        }
        let query = String::from_utf8(frame.payload)
            .map_err(|_| Error::Protocol("query is not UTF-8".into()))?;
        debug!(%peer, query = query.trim(), "query received");

        for outcome in session.execute_query(&query) {
            match outcome {
                Ok(outcome) => {
                    for set in &outcome.sets {
                        wire::write_frame(
                            &mut writer,
                            wire::MSG_ROW_DESCRIPTION,
                            &wire::encode_row_description(&set.attrs),
                        )?;
                        for row in &set.rows {
                            wire::write_frame(
                                &mut writer,
                                wire::MSG_DATA_ROW,
                                &wire::encode_data_row(row),
                            )?;
                        }
                    }
                    wire::write_frame(
                        &mut writer,
                        wire::MSG_COMMAND_COMPLETE,
                        outcome.message.as_bytes(),
                    )?;
                }
                Err(e) => {
                    wire::write_frame(&mut writer, wire::MSG_ERROR, e.to_string().as_bytes())?;
                }
            }
        }
        wire::write_frame(&mut writer, wire::MSG_READY, &[])?;
    }

    // Dropping the session rolls back any transaction the client left
    // open before disconnecting.
    info!(%peer, "client disconnected");
    Ok(())
}
