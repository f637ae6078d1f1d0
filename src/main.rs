//! Entry point: a small file-transfer application over the link layer.
//!
//! The application protocol is deliberately trivial — the first byte of each
//! block identifies its type (file name, file data, end of file), which
//! relies on the link layer preserving block boundaries. All protocol work is
//! delegated to the library; this file owns only argument parsing, logging
//! setup, and file I/O.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use arq_link::{optimal_block_size, Connection, UdpTransport};

/// Block type markers (first byte of every application block).
const FILE_NAME: u8 = 233;
const FILE_DATA: u8 = 234;
const FILE_END: u8 = 235;

/// Reliable file transfer over a stop-and-wait link.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Send a file to a receiving peer.
    Send {
        /// File to transmit.
        #[arg(short, long)]
        file: PathBuf,
        /// Local address to bind (port 0 = ephemeral).
        #[arg(short, long, default_value = "0.0.0.0:9001")]
        bind: SocketAddr,
        /// Address of the receiving peer.
        #[arg(short, long)]
        peer: SocketAddr,
    },
    /// Receive a file from a sending peer.
    Recv {
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: SocketAddr,
        /// Address of the sending peer.
        #[arg(short, long)]
        peer: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Set RUST_LOG to control verbosity (e.g. RUST_LOG=arq_link=debug).
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.mode {
        Mode::Send { file, bind, peer } => send_file(&file, bind, peer).await,
        Mode::Recv { bind, peer } => receive_file(bind, peer).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("transfer failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Send one file: name block, data blocks, end-of-file block.
async fn send_file(
    path: &PathBuf,
    bind: SocketAddr,
    peer: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let contents = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .ok_or("path has no file name")?
        .to_string_lossy()
        .into_owned();

    let transport = UdpTransport::open(bind, peer).await?;
    log::info!("sending {name} ({} bytes) to {peer}", contents.len());
    let mut conn = Connection::connect(transport);

    let mut block = vec![FILE_NAME];
    block.extend_from_slice(name.as_bytes());
    conn.send(&block).await?;

    // One type byte per block leaves room for one byte less than the optimum.
    let chunk_size = optimal_block_size() - 1;
    for chunk in contents.chunks(chunk_size) {
        let mut block = Vec::with_capacity(1 + chunk.len());
        block.push(FILE_DATA);
        block.extend_from_slice(chunk);
        conn.send(&block).await?;
    }

    conn.send(&[FILE_END]).await?;
    let stats = conn.disconnect();
    println!("file sent\n{stats}");
    Ok(())
}

/// Receive one file and write it to the current directory.
async fn receive_file(
    bind: SocketAddr,
    peer: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport = UdpTransport::open(bind, peer).await?;
    log::info!("waiting for a file from {peer}");
    let mut conn = Connection::connect(transport);

    let mut name: Option<String> = None;
    let mut contents: Vec<u8> = Vec::new();

    loop {
        let block = conn.receive(arq_link::frame::MAX_BLOCK).await?;
        match block.split_first() {
            Some((&FILE_NAME, rest)) => {
                let n = String::from_utf8_lossy(rest).into_owned();
                log::info!("incoming file: {n}");
                name = Some(n);
            }
            Some((&FILE_DATA, rest)) => contents.extend_from_slice(rest),
            Some((&FILE_END, _)) => break,
            Some((&other, _)) => log::warn!("ignoring block with unknown type {other}"),
            None => log::warn!("ignoring empty block"),
        }
    }

    let name = name.ok_or("peer never sent a file name")?;
    tokio::fs::write(&name, &contents).await?;
    let stats = conn.disconnect();
    println!("received {name} ({} bytes)\n{stats}", contents.len());
    Ok(())
}
