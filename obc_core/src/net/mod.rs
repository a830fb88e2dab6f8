//! Telecommand reception over UDP (a stand-in transport for the radio modem
//! and debug UART, per §6's Non-goal on the specific wire protocol below the
//! uplink frame grammar).

use crate::logging::{self, Severity, Subsystem};
use crate::telecommand::agenda::AgendaT;
use crate::telecommand::definitions::StaticTable;
use obc_wire::frame::{parse_frame, Channel};
use std::sync::Arc;
use tokio::net::UdpSocket;

pub async fn bind(bind_addr: &str) -> anyhow::Result<UdpSocket> {
    Ok(UdpSocket::bind(bind_addr).await?)
}

/// Reads uplink frames from `socket` and adds successfully parsed
/// telecommands to `agenda`. Runs until the socket errors.
pub async fn spawn_rx_task(
    socket: Arc<UdpSocket>,
    channel: Channel,
    device_prefix: String,
    agenda: Arc<AgendaT>,
) {
    let mut buf = [0u8; 1024];
    loop {
        let (len, _peer) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(?e, ?channel, "telecommand RX: socket error");
                continue;
            }
        };
        let Ok(text) = std::str::from_utf8(&buf[..len]) else {
            logging::global().log(
                Subsystem::Telecommand,
                Severity::Warning,
                logging::SINK_ALL,
                format_args!("telecommand RX ({channel:?}): non-UTF8 frame dropped"),
            );
            continue;
        };

        match parse_frame(text, &device_prefix, channel, &StaticTable) {
            Ok(parsed) => {
                if let Err(e) = agenda.add(parsed) {
                    logging::global().log(
                        Subsystem::Telecommand,
                        Severity::Warning,
                        logging::SINK_ALL,
                        format_args!("telecommand RX ({channel:?}): add rejected: {e}"),
                    );
                }
            }
            Err(code) => {
                logging::global().log(
                    Subsystem::Telecommand,
                    Severity::Warning,
                    logging::SINK_ALL,
                    format_args!("telecommand RX ({channel:?}): parse error code {}", code.code()),
                );
            }
        }
    }
}
