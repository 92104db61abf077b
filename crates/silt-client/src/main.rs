//! silt client
//!
//! A thin line-oriented client: each input line is sent as one query
//! frame, and the response frames are printed until the server signals
//! ready-for-query.

use std::io::{self, BufRead, Write};
use std::net::TcpStream;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use silt_core::datum::DatumType;
use silt_core::wire;

/// The silt database client.
#[derive(Parser)]
#[command(name = "silt-client", version, about, long_about = None)]
struct Cli {
    /// Script of statements to run; reads stdin line-by-line otherwise.
    script: Option<PathBuf>,

    /// Server host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = 4547)]
    port: u16,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut stream = TcpStream::connect((cli.host.as_str(), cli.port))
        .with_context(|| format!("cannot connect to {}:{}", cli.host, cli.port))?;

    match &cli.script {
        Some(path) => {
            let script = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read script {}", path.display()))?;
            for line in script.lines() {
                run_line(&mut stream, line)?;
            }
        }
        None => {
            let stdin = io::stdin();
            prompt()?;
            for line in stdin.lock().lines() {
                run_line(&mut stream, &line?)?;
                prompt()?;
            }
        }
    }

    Ok(())
}

fn prompt() -> io::Result<()> {
    print!("silt> ");
    io::stdout().flush()
}

/// Sends one query line and prints the response sequence.
fn run_line(stream: &mut TcpStream, line: &str) -> anyhow::Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    wire::write_frame(stream, wire::MSG_QUERY, line.as_bytes())?;

    let mut columns: Vec<(DatumType, String)> = Vec::new();
    loop {
        let frame = wire::read_frame(stream)?
            .context("server closed the connection")?;
        match frame.tag {
            wire::MSG_ROW_DESCRIPTION => {
                columns = wire::decode_row_description(&frame.payload)?;
                let names: Vec<&str> = columns.iter().map(|(_, n)| n.as_str()).collect();
                println!("{}", names.join(","));
            }
            wire::MSG_DATA_ROW => {
                let data = wire::decode_data_row(&frame.payload, &columns)?;
                let rendered: Vec<String> = data.iter().map(ToString::to_string).collect();
                println!("{}", rendered.join(","));
            }
            wire::MSG_COMMAND_COMPLETE => {
                println!("{}", String::from_utf8_lossy(&frame.payload));
            }
            wire::MSG_ERROR => {
                eprintln!("{}", String::from_utf8_lossy(&frame.payload));
            }
            wire::MSG_READY => break,
            other => anyhow::bail!("unexpected message type {:?}", other as char),
        }
    }

    Ok(())
}
