//! Downlink framer (§4.8, §6): wraps an application payload in an optional
//! CSP header and a packet-type byte, then KISS-frames the result onto a
//! single outbound channel shared by beacons, telecommand responses, log
//! messages, and the bulk-downlink streamer.

pub mod beacon;
pub mod bulk;

use crate::logging::{self, Severity, Subsystem};
use obc_wire::packet::{self, CspHeader, PacketType};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Clone)]
pub struct Downlink {
    csp_header: Option<CspHeader>,
    tx: UnboundedSender<Vec<u8>>,
}

impl Downlink {
    pub fn new(csp_header: Option<CspHeader>, tx: UnboundedSender<Vec<u8>>) -> Self {
        Self { csp_header, tx }
    }

    pub fn send_packet(&self, packet_type: PacketType, payload: &[u8]) {
        let frame = packet::build_frame(self.csp_header, packet_type, payload);
        let mut kiss_out: heapless::Vec<u8, 512> = heapless::Vec::new();
        if obc_wire::kiss::encode(&frame, &mut kiss_out).is_err() {
            logging::global().log(
                Subsystem::Log,
                Severity::Error,
                logging::all_sinks_except(0),
                format_args!("downlink: frame exceeded KISS buffer, dropped"),
            );
            return;
        }
        if self.tx.send(kiss_out.to_vec()).is_err() {
            logging::global().log(
                Subsystem::Log,
                Severity::Warning,
                logging::all_sinks_except(0),
                format_args!("downlink: outbound channel closed"),
            );
        }
    }
}

/// Builds the UDP-backed outbound channel: frames pushed onto `tx` are
/// drained and written to the peer socket in the order they were sent.
pub fn spawn_udp_sink(socket: std::sync::Arc<tokio::net::UdpSocket>) -> UnboundedSender<Vec<u8>> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = socket.send(&frame).await {
                tracing::warn!(?e, "downlink: UDP send failed");
            }
        }
    });
    tx
}
