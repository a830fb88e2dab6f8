//! Ground station operator CLI: sends `CTS1+...!` uplink frames over UDP and
//! decodes/pretty-prints downlink KISS frames from the simulated radio link.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use obc_wire::packet;
use tokio::net::UdpSocket;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "CTS1 ground station: send uplink frames, listen for downlink")]
struct Cli {
    #[arg(long, default_value = "0.0.0.0:7891")]
    bind_addr: String,
    #[arg(long, default_value = "127.0.0.1:7890")]
    obc_addr: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sends one raw uplink frame, e.g. `CTS1+hello_world()!`.
    Send { frame: String },
    /// Binds and prints every downlink KISS frame received.
    Listen,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ground_station=info".parse().unwrap()))
        .compact()
        .init();

    let cli = Cli::parse();
    let socket = UdpSocket::bind(&cli.bind_addr)
        .await
        .with_context(|| format!("binding {}", cli.bind_addr))?;
    socket.connect(&cli.obc_addr).await.with_context(|| format!("connecting to {}", cli.obc_addr))?;

    match cli.command {
        Command::Send { frame } => send_frame(&socket, &frame).await,
        Command::Listen => listen(&socket).await,
    }
}

async fn send_frame(socket: &UdpSocket, frame: &str) -> Result<()> {
    socket.send(frame.as_bytes()).await?;
    info!(%frame, "sent uplink frame");
    Ok(())
}

async fn listen(socket: &UdpSocket) -> Result<()> {
    info!("listening for downlink frames, Ctrl+C to stop");
    let mut buf = [0u8; 1024];
    loop {
        let len = socket.recv(&mut buf).await?;
        let mut decoded: heapless::Vec<u8, 512> = heapless::Vec::new();
        if obc_wire::kiss::decode(&buf[..len], &mut decoded).is_err() {
            warn!("dropped frame: KISS decode failed");
            continue;
        }
        print_packet(decoded.as_slice());
    }
}

fn print_packet(frame: &[u8]) {
    let Some((&packet_type_byte, payload)) = frame.split_first() else {
        warn!("empty downlink frame");
        return;
    };

    match packet_type_byte {
        0x01 | 0x02 => println!("beacon: {payload:02x?}"),
        0x03 => match std::str::from_utf8(payload) {
            Ok(line) => println!("log: {}", line.trim_end()),
            Err(_) => println!("log (non-UTF8): {payload:02x?}"),
        },
        0x04 => match packet::parse_tcmd_response_payload(payload) {
            Some(v) => println!(
                "tcmd response: ts_sent={} code={} duration_ms={} text={:?}",
                v.ts_sent_ms,
                v.response_code,
                v.duration_ms,
                String::from_utf8_lossy(v.response_text)
            ),
            None => println!("tcmd response: malformed payload {payload:02x?}"),
        },
        0x05 | 0x06 | 0x07 => match packet::parse_bulk_payload(payload) {
            Some(v) => println!(
                "bulk packet: seq={}/{} offset={} bytes={}",
                v.seq_num,
                v.total_seq_num,
                v.absolute_offset,
                v.data.len()
            ),
            None => println!("bulk packet: malformed payload {payload:02x?}"),
        },
        other => println!("unknown packet type {other:#x}: {payload:02x?}"),
    }
}
