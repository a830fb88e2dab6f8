//! RF antenna switch controller (§4.9): policy for which antenna is active,
//! driven by a background task at beacon cadence.

use crate::hw::{AdcsHandle, AntennaSelect, RfSwitchPin};
use crate::logging::{self, Severity, Subsystem};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    ToggleEveryBeacon,
    ForceAnt1,
    ForceAnt2,
    UseAdcsNormal,
    UseAdcsFlipped,
}

/// Roll thresholds in millidegrees: these ranges select antenna 2, everything
/// else selects antenna 1.
const ANT2_RANGES: [(u32, u32); 3] = [(0, 45_000), (135_000, 225_000), (315_000, 360_000)];

fn roll_to_antenna(roll_millideg: u32) -> AntennaSelect {
    let in_ant2_range = ANT2_RANGES
        .iter()
        .any(|&(lo, hi)| roll_millideg >= lo && roll_millideg < hi);
    if in_ant2_range {
        AntennaSelect::Secondary
    } else {
        AntennaSelect::Primary
    }
}

pub struct RfSwitchState {
    mode: RwLock<ControlMode>,
    last_uplink_uptime_ms: AtomicU64,
}

impl RfSwitchState {
    pub fn new() -> Self {
        Self {
            mode: RwLock::new(ControlMode::ToggleEveryBeacon),
            last_uplink_uptime_ms: AtomicU64::new(0),
        }
    }

    pub fn mode(&self) -> ControlMode {
        *self.mode.read()
    }

    pub fn set_mode(&self, mode: ControlMode) {
        *self.mode.write() = mode;
    }

    pub fn note_uplink(&self, now_uptime_ms: u64) {
        self.last_uplink_uptime_ms.store(now_uptime_ms, Ordering::SeqCst);
    }

    pub fn since_last_uplink_ms(&self, now_uptime_ms: u64) -> u64 {
        now_uptime_ms.saturating_sub(self.last_uplink_uptime_ms.load(Ordering::SeqCst))
    }
}

impl Default for RfSwitchState {
    fn default() -> Self {
        Self::new()
    }
}

/// One update cycle, called from the supervisor (§4.10 step 4) immediately
/// before a beacon transmission. Returns the antenna now selected.
pub async fn update_before_beacon(
    state: &RfSwitchState,
    pin: &Arc<dyn RfSwitchPin>,
    adcs: &Arc<dyn AdcsHandle>,
    now_uptime_ms: u64,
    max_no_uplink_sec: u64,
) -> AntennaSelect {
    if state.since_last_uplink_ms(now_uptime_ms) > max_no_uplink_sec * 1000 {
        if state.mode() != ControlMode::ToggleEveryBeacon {
            logging::global().log(
                Subsystem::Telecommand,
                Severity::Normal,
                logging::SINK_ALL,
                format_args!("RF switch: no uplinks for {max_no_uplink_sec}s, reverting to ToggleEveryBeacon"),
            );
            state.set_mode(ControlMode::ToggleEveryBeacon);
        }
    }

    match state.mode() {
        ControlMode::ForceAnt1 => pin.select(AntennaSelect::Primary),
        ControlMode::ForceAnt2 => pin.select(AntennaSelect::Secondary),
        ControlMode::UseAdcsNormal | ControlMode::UseAdcsFlipped => {
            if !adcs.is_healthy().await {
                logging::global().log(
                    Subsystem::Adcs,
                    Severity::Error,
                    logging::SINK_ALL,
                    format_args!("RF switch: ADCS unavailable, reverting to ToggleEveryBeacon"),
                );
                state.set_mode(ControlMode::ToggleEveryBeacon);
                toggle(pin);
            } else {
                match adcs.roll_millideg().await {
                    Ok(roll_millideg) => {
                        let mut selection = roll_to_antenna(roll_millideg);
                        if state.mode() == ControlMode::UseAdcsFlipped {
                            selection = flip(selection);
                        }
                        pin.select(selection);
                    }
                    Err(e) => {
                        logging::global().log(
                            Subsystem::Adcs,
                            Severity::Error,
                            logging::SINK_ALL,
                            format_args!("RF switch: ADCS roll read failed ({e}), reverting to ToggleEveryBeacon"),
                        );
                        state.set_mode(ControlMode::ToggleEveryBeacon);
                        toggle(pin);
                    }
                }
            }
        }
        ControlMode::ToggleEveryBeacon => toggle(pin),
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    pin.current_selection()
}

fn toggle(pin: &Arc<dyn RfSwitchPin>) {
    let next = flip(pin.current_selection());
    pin.select(next);
}

fn flip(antenna: AntennaSelect) -> AntennaSelect {
    match antenna {
        AntennaSelect::Primary => AntennaSelect::Secondary,
        AntennaSelect::Secondary => AntennaSelect::Primary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_thresholds_select_antenna_2_in_named_ranges() {
        assert_eq!(roll_to_antenna(0), AntennaSelect::Secondary);
        assert_eq!(roll_to_antenna(44_999), AntennaSelect::Secondary);
        assert_eq!(roll_to_antenna(45_000), AntennaSelect::Primary);
        assert_eq!(roll_to_antenna(180_000), AntennaSelect::Secondary);
        assert_eq!(roll_to_antenna(270_000), AntennaSelect::Primary);
        assert_eq!(roll_to_antenna(350_000), AntennaSelect::Secondary);
    }

    #[tokio::test]
    async fn reverts_to_toggle_after_max_no_uplink() {
        let state = RfSwitchState::new();
        state.set_mode(ControlMode::UseAdcsNormal);
        state.note_uplink(0);
        let pin: Arc<dyn RfSwitchPin> = Arc::new(crate::hw::SimRfSwitchPin::new());
        let adcs: Arc<dyn AdcsHandle> = Arc::new(crate::hw::SimAdcsHandle::new(true));
        update_before_beacon(&state, &pin, &adcs, 100_000_000, 60).await;
        assert_eq!(state.mode(), ControlMode::ToggleEveryBeacon);
    }
}
