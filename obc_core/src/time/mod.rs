//! Time service (§4.1): monotonic uptime + synchronizable Unix epoch with provenance.
//!
//! The epoch is always reconstructed as an add from the last sync point, not
//! read from a live RTC, so that all timestamps within one sync interval
//! agree to within a single monotonic clock tick.

use parking_lot::RwLock;
use std::fmt::Write as _;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochSource {
    None,
    Gnss,
    Telecommand,
    TelecommandCorrection,
    EpsRtc,
}

impl EpochSource {
    pub fn code(self) -> char {
        match self {
            EpochSource::None => 'N',
            EpochSource::Gnss => 'G',
            EpochSource::Telecommand => 'T',
            EpochSource::TelecommandCorrection => 'C',
            EpochSource::EpsRtc => 'E',
        }
    }
}

struct SyncPoint {
    epoch_at_sync_ms: u64,
    uptime_at_sync_ms: u64,
    source: EpochSource,
}

pub struct TimeService {
    boot_instant: Instant,
    sync: RwLock<SyncPoint>,
}

impl TimeService {
    pub fn new() -> Self {
        Self {
            boot_instant: Instant::now(),
            sync: RwLock::new(SyncPoint {
                epoch_at_sync_ms: 0,
                uptime_at_sync_ms: 0,
                source: EpochSource::None,
            }),
        }
    }

    pub fn uptime_ms(&self) -> u64 {
        self.boot_instant.elapsed().as_millis() as u64
    }

    pub fn unix_epoch_ms(&self) -> u64 {
        let sync = self.sync.read();
        let elapsed = self.uptime_ms().saturating_sub(sync.uptime_at_sync_ms);
        sync.epoch_at_sync_ms + elapsed
    }

    pub fn current_source(&self) -> EpochSource {
        self.sync.read().source
    }

    /// Records a synchronization event. Accepts epochs that regress relative
    /// to the previous sync (and lets the caller log a warning), per §3.
    pub fn set_epoch_ms(&self, new_epoch_ms: u64, source: EpochSource) -> bool {
        let uptime_now = self.uptime_ms();
        let mut sync = self.sync.write();
        let regressed = new_epoch_ms < sync.epoch_at_sync_ms;
        sync.epoch_at_sync_ms = new_epoch_ms;
        sync.uptime_at_sync_ms = uptime_now;
        sync.source = source;
        regressed
    }

    /// `"EEEEEEEEEEEEE+DDDDDDDDDD_X"`.
    pub fn format_timestamp(&self) -> heapless::String<32> {
        let sync = self.sync.read();
        let delta = self.uptime_ms().saturating_sub(sync.uptime_at_sync_ms);
        let mut s: heapless::String<32> = heapless::String::new();
        let _ = write!(
            s,
            "{:013}+{:010}_{}",
            sync.epoch_at_sync_ms,
            delta,
            sync.source.code()
        );
        s
    }

    /// `yyyymmddTHHMMSS.sss_X_delta`.
    pub fn format_datetime(&self) -> heapless::String<48> {
        use chrono::{DateTime, Utc};
        let epoch_ms = self.unix_epoch_ms();
        let source = self.current_source();
        let sync = self.sync.read();
        let delta = self.uptime_ms().saturating_sub(sync.uptime_at_sync_ms);
        drop(sync);

        let secs = (epoch_ms / 1000) as i64;
        let millis = (epoch_ms % 1000) as u32;
        let dt: DateTime<Utc> = DateTime::from_timestamp(secs, millis * 1_000_000)
            .unwrap_or_else(|| DateTime::from_timestamp(0, 0).unwrap());

        let mut s: heapless::String<48> = heapless::String::new();
        let _ = write!(
            s,
            "{}_{}_{}",
            dt.format("%Y%m%dT%H%M%S%.3f"),
            source.code(),
            delta
        );
        s
    }
}

impl Default for TimeService {
    fn default() -> Self {
        Self::new()
    }
}

static TIME_SERVICE: once_cell::sync::OnceCell<TimeService> = once_cell::sync::OnceCell::new();

pub fn init() -> &'static TimeService {
    TIME_SERVICE.get_or_init(TimeService::new)
}

pub fn global() -> &'static TimeService {
    TIME_SERVICE.get_or_init(TimeService::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_advances_with_uptime_from_last_sync() {
        let ts = TimeService::new();
        ts.set_epoch_ms(1_000_000, EpochSource::Gnss);
        let e1 = ts.unix_epoch_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let e2 = ts.unix_epoch_ms();
        assert!(e2 >= e1);
    }

    #[test]
    fn set_epoch_ms_reports_regression() {
        let ts = TimeService::new();
        ts.set_epoch_ms(10_000, EpochSource::Gnss);
        let regressed = ts.set_epoch_ms(5_000, EpochSource::Telecommand);
        assert!(regressed);
        assert_eq!(ts.unix_epoch_ms() / 1000, 5); // within the same ms tick
    }

    #[test]
    fn format_timestamp_has_expected_shape() {
        let ts = TimeService::new();
        ts.set_epoch_ms(42, EpochSource::EpsRtc);
        let s = ts.format_timestamp();
        assert!(s.ends_with("_E"));
        assert_eq!(s.find('+'), Some(13));
    }
}
