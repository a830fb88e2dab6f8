//! Beacon assembly (§6 `BeaconBasic`): periodic unsolicited downlink packet
//! announcing satellite state.

use super::Downlink;
use crate::hw::AntennaSelect;
use crate::rf_switch::ControlMode;
use obc_wire::packet::{self, PacketType};

fn antenna_byte(antenna: AntennaSelect) -> u8 {
    match antenna {
        AntennaSelect::Primary => 1,
        AntennaSelect::Secondary => 2,
    }
}

fn mode_byte(mode: ControlMode) -> u8 {
    match mode {
        ControlMode::ToggleEveryBeacon => 0,
        ControlMode::ForceAnt1 => 1,
        ControlMode::ForceAnt2 => 2,
        ControlMode::UseAdcsNormal => 3,
        ControlMode::UseAdcsFlipped => 4,
    }
}

pub fn send_beacon(
    downlink: &Downlink,
    active_antenna: AntennaSelect,
    control_mode: ControlMode,
    uptime_ms: u32,
    since_last_uplink_ms: u32,
    unix_epoch_ms: u64,
) {
    let payload = packet::build_beacon_basic_payload(
        antenna_byte(active_antenna),
        mode_byte(control_mode),
        uptime_ms,
        since_last_uplink_ms,
        unix_epoch_ms,
    );
    downlink.send_packet(PacketType::BeaconMinimal, &payload);
}
