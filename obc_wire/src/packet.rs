//! Downlink packet types and wire layouts (§6).
//!
//! All multi-byte integer fields use little-endian, matching the one field
//! the spec pins down explicitly (`TcmdResponse`'s `ts_sent(8, LE)` and
//! `duration_ms(2, LE)`); the convention is applied uniformly to the fields
//! the spec leaves otherwise unstated.

use heapless::Vec as HVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    BeaconMinimal = 0x01,
    BeaconFull = 0x02,
    LogMessage = 0x03,
    TcmdResponse = 0x04,
    DownlinkFirst = 0x05,
    DownlinkNext = 0x06,
    DownlinkLast = 0x07,
}

impl PacketType {
    pub fn byte(self) -> u8 {
        self as u8
    }
}

/// Fixed-at-configuration-time CSP-style network header (4 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CspHeader {
    pub priority: u8,
    pub src_addr: u8,
    pub dst_addr: u8,
    pub src_port: u8,
    pub dst_port: u8,
    pub flags: u8,
}

impl CspHeader {
    /// Packs the header's routing fields into the fixed 4-byte on-wire form.
    pub fn to_bytes(self) -> [u8; 4] {
        [
            self.priority,
            (self.src_addr << 4) | (self.dst_addr & 0x0F),
            (self.src_port << 4) | (self.dst_port & 0x0F),
            self.flags,
        ]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            priority: bytes[0],
            src_addr: bytes[1] >> 4,
            dst_addr: bytes[1] & 0x0F,
            src_port: bytes[2] >> 4,
            dst_port: bytes[2] & 0x0F,
            flags: bytes[3],
        }
    }
}

pub const MAX_APP_PAYLOAD: usize = 200;
pub const MAX_FRAME: usize = 255;

/// Assembles `[csp_header?] [packet_type] [payload]`, ready for KISS framing.
pub fn build_frame(
    csp_header: Option<CspHeader>,
    packet_type: PacketType,
    payload: &[u8],
) -> HVec<u8, MAX_FRAME> {
    let mut out: HVec<u8, MAX_FRAME> = HVec::new();
    if let Some(h) = csp_header {
        let _ = out.extend_from_slice(&h.to_bytes());
    }
    let _ = out.push(packet_type.byte());
    let _ = out.extend_from_slice(payload);
    out
}

/// `TcmdResponse` payload: `ts_sent(8,LE) | code(1) | duration_ms(2,LE) | text`.
pub fn build_tcmd_response_payload(
    ts_sent_ms: u64,
    response_code: u8,
    duration_ms: u16,
    response_text: &[u8],
) -> HVec<u8, MAX_APP_PAYLOAD> {
    let mut out: HVec<u8, MAX_APP_PAYLOAD> = HVec::new();
    let _ = out.extend_from_slice(&ts_sent_ms.to_le_bytes());
    let _ = out.push(response_code);
    let _ = out.extend_from_slice(&duration_ms.to_le_bytes());
    let max_text = MAX_APP_PAYLOAD - out.len();
    let text = if response_text.len() > max_text {
        &response_text[..max_text]
    } else {
        response_text
    };
    let _ = out.extend_from_slice(text);
    out
}

pub struct TcmdResponseView<'a> {
    pub ts_sent_ms: u64,
    pub response_code: u8,
    pub duration_ms: u16,
    pub response_text: &'a [u8],
}

pub fn parse_tcmd_response_payload(payload: &[u8]) -> Option<TcmdResponseView<'_>> {
    if payload.len() < 11 {
        return None;
    }
    let ts_sent_ms = u64::from_le_bytes(payload[0..8].try_into().ok()?);
    let response_code = payload[8];
    let duration_ms = u16::from_le_bytes(payload[9..11].try_into().ok()?);
    Some(TcmdResponseView {
        ts_sent_ms,
        response_code,
        duration_ms,
        response_text: &payload[11..],
    })
}

/// `BeaconBasic` payload: `"CTS1"(4) | active_antenna(1) | mode(1) | uptime_ms(4,LE) |
/// since_last_uplink_ms(4,LE) | unix_epoch_ms(8,LE)`.
pub fn build_beacon_basic_payload(
    active_antenna: u8,
    control_mode: u8,
    uptime_ms: u32,
    since_last_uplink_ms: u32,
    unix_epoch_ms: u64,
) -> [u8; 22] {
    let mut out = [0u8; 22];
    out[0..4].copy_from_slice(b"CTS1");
    out[4] = active_antenna;
    out[5] = control_mode;
    out[6..10].copy_from_slice(&uptime_ms.to_le_bytes());
    out[10..14].copy_from_slice(&since_last_uplink_ms.to_le_bytes());
    out[14..22].copy_from_slice(&unix_epoch_ms.to_le_bytes());
    out
}

/// Bulk packet payload: `seq_num(4,LE) | total_seq_num(4,LE) | absolute_offset(4,LE) | data`.
///
/// Widened from the original firmware's single-byte sequence fields: the
/// wire format doesn't pin their width, and a `uint8_t` caps a session at 255
/// packets, well under the 1 MB session cap at small payload capacities.
pub fn build_bulk_payload(
    seq_num: u32,
    total_seq_num: u32,
    absolute_offset: u32,
    data: &[u8],
) -> HVec<u8, MAX_APP_PAYLOAD> {
    let mut out: HVec<u8, MAX_APP_PAYLOAD> = HVec::new();
    let _ = out.extend_from_slice(&seq_num.to_le_bytes());
    let _ = out.extend_from_slice(&total_seq_num.to_le_bytes());
    let _ = out.extend_from_slice(&absolute_offset.to_le_bytes());
    let _ = out.extend_from_slice(data);
    out
}

pub struct BulkPayloadView<'a> {
    pub seq_num: u32,
    pub total_seq_num: u32,
    pub absolute_offset: u32,
    pub data: &'a [u8],
}

pub fn parse_bulk_payload(payload: &[u8]) -> Option<BulkPayloadView<'_>> {
    if payload.len() < 12 {
        return None;
    }
    Some(BulkPayloadView {
        seq_num: u32::from_le_bytes(payload[0..4].try_into().ok()?),
        total_seq_num: u32::from_le_bytes(payload[4..8].try_into().ok()?),
        absolute_offset: u32::from_le_bytes(payload[8..12].try_into().ok()?),
        data: &payload[12..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csp_header_roundtrips_nibbles() {
        let h = CspHeader {
            priority: 1,
            src_addr: 5,
            dst_addr: 10,
            src_port: 3,
            dst_port: 7,
            flags: 0xAB,
        };
        let bytes = h.to_bytes();
        let back = CspHeader::from_bytes(bytes);
        assert_eq!(h, back);
    }

    #[test]
    fn tcmd_response_roundtrips() {
        let payload = build_tcmd_response_payload(1234, 0, 56, b"ok");
        let view = parse_tcmd_response_payload(&payload).unwrap();
        assert_eq!(view.ts_sent_ms, 1234);
        assert_eq!(view.response_code, 0);
        assert_eq!(view.duration_ms, 56);
        assert_eq!(view.response_text, b"ok");
    }

    #[test]
    fn bulk_payload_roundtrips() {
        let payload = build_bulk_payload(1, 3, 200, &[1, 2, 3]);
        let view = parse_bulk_payload(&payload).unwrap();
        assert_eq!(view.seq_num, 1);
        assert_eq!(view.total_seq_num, 3);
        assert_eq!(view.absolute_offset, 200);
        assert_eq!(view.data, &[1, 2, 3]);
    }

    #[test]
    fn bulk_payload_seq_num_survives_past_u8_range() {
        let payload = build_bulk_payload(300, 600, 60_000, &[]);
        let view = parse_bulk_payload(&payload).unwrap();
        assert_eq!(view.seq_num, 300);
        assert_eq!(view.total_seq_num, 600);
    }
}
