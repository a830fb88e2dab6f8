//! Logging subsystem (§4.3): severity/subsystem/sink-masked routing with a
//! circular in-RAM backup table, so a failed sink can be replayed later.

pub mod file_sink;

use heapless::String as HString;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

pub const LOG_TABLE_CAPACITY: usize = 128;
pub const MAX_LINE_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Subsystem {
    Obc = 1 << 0,
    UhfRadio = 1 << 1,
    UmbilicalUart = 1 << 2,
    Gps = 1 << 3,
    Mpi = 1 << 4,
    Eps = 1 << 5,
    Boom = 1 << 6,
    Adcs = 1 << 7,
    FileSystem = 1 << 8,
    Flash = 1 << 9,
    AntennaDeploy = 1 << 10,
    Log = 1 << 11,
    Telecommand = 1 << 12,
}

impl Subsystem {
    pub const ALL: [Subsystem; 13] = [
        Subsystem::Obc,
        Subsystem::UhfRadio,
        Subsystem::UmbilicalUart,
        Subsystem::Gps,
        Subsystem::Mpi,
        Subsystem::Eps,
        Subsystem::Boom,
        Subsystem::Adcs,
        Subsystem::FileSystem,
        Subsystem::Flash,
        Subsystem::AntennaDeploy,
        Subsystem::Log,
        Subsystem::Telecommand,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Subsystem::Obc => "OBC",
            Subsystem::UhfRadio => "UHF_RADIO",
            Subsystem::UmbilicalUart => "UMBILICAL_UART",
            Subsystem::Gps => "GPS",
            Subsystem::Mpi => "MPI",
            Subsystem::Eps => "EPS",
            Subsystem::Boom => "BOOM",
            Subsystem::Adcs => "ADCS",
            Subsystem::FileSystem => "LFS",
            Subsystem::Flash => "FLASH",
            Subsystem::AntennaDeploy => "ANTENNA_DEPLOY",
            Subsystem::Log => "LOG",
            Subsystem::Telecommand => "TELECOMMAND",
        }
    }

    fn mask_index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Severity {
    Debug = 1 << 0,
    Normal = 1 << 1,
    Warning = 1 << 2,
    Error = 1 << 3,
    Critical = 1 << 4,
}

impl Severity {
    pub fn name(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Normal => "NORMAL",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SinkKind {
    Uhf = 1 << 0,
    File = 1 << 1,
    UmbilicalUart = 1 << 2,
}

pub const ALL_SINK_KINDS: [SinkKind; 3] = [SinkKind::Uhf, SinkKind::File, SinkKind::UmbilicalUart];

/// Complement of `mask` restricted to known sinks; lets a sink log an error
/// about itself without recursing back into itself.
pub fn all_sinks_except(mask: u8) -> u8 {
    ALL_SINK_KINDS
        .iter()
        .fold(0u8, |acc, k| acc | (*k as u8))
        & !mask
}

pub const SINK_ALL: u8 = SinkKind::Uhf as u8 | SinkKind::File as u8 | SinkKind::UmbilicalUart as u8;

#[derive(Clone, Copy)]
struct SinkState {
    enabled: bool,
    severity_mask: u8,
}

impl Default for SinkState {
    fn default() -> Self {
        Self {
            enabled: true,
            severity_mask: 0b11111,
        }
    }
}

#[derive(Clone, Copy)]
struct SubsystemState {
    file_logging_enabled: bool,
    severity_mask: u8,
}

impl Default for SubsystemState {
    fn default() -> Self {
        Self {
            file_logging_enabled: true,
            severity_mask: 0b11111,
        }
    }
}

#[derive(Clone)]
pub struct LogEntry {
    pub source: Subsystem,
    pub severity: Severity,
    pub sink_mask: u8,
    pub full_text: HString<MAX_LINE_LEN>,
}

struct LogTable {
    entries: heapless::Deque<LogEntry, LOG_TABLE_CAPACITY>,
}

pub struct LogMessage {
    pub line: HString<MAX_LINE_LEN>,
}

pub struct Logging {
    sinks: Mutex<[SinkState; 3]>,
    subsystems: Mutex<[SubsystemState; 13]>,
    table: Mutex<LogTable>,
    file_tx: OnceCell<UnboundedSender<LogMessage>>,
    uhf_tx: OnceCell<UnboundedSender<LogMessage>>,
    umbilical_tx: OnceCell<UnboundedSender<LogMessage>>,
}

impl Logging {
    pub fn new() -> Self {
        Self {
            sinks: Mutex::new([SinkState::default(); 3]),
            subsystems: Mutex::new([SubsystemState::default(); 13]),
            table: Mutex::new(LogTable {
                entries: heapless::Deque::new(),
            }),
            file_tx: OnceCell::new(),
            uhf_tx: OnceCell::new(),
            umbilical_tx: OnceCell::new(),
        }
    }

    pub fn connect_file_sink(&self, tx: UnboundedSender<LogMessage>) {
        let _ = self.file_tx.set(tx);
    }
    pub fn connect_uhf_sink(&self, tx: UnboundedSender<LogMessage>) {
        let _ = self.uhf_tx.set(tx);
    }
    pub fn connect_umbilical_sink(&self, tx: UnboundedSender<LogMessage>) {
        let _ = self.umbilical_tx.set(tx);
    }

    pub fn set_sink_enabled(&self, kind: SinkKind, enabled: bool) {
        self.sinks.lock()[sink_index(kind)].enabled = enabled;
    }

    pub fn set_subsystem_severity_mask(&self, subsystem: Subsystem, mask: u8) {
        self.subsystems.lock()[subsystem.mask_index()].severity_mask = mask;
    }

    fn debug_enabled_anywhere(&self, source: Subsystem) -> bool {
        let sinks = self.sinks.lock();
        let subsystem_allows =
            self.subsystems.lock()[source.mask_index()].severity_mask & Severity::Debug as u8 != 0;
        subsystem_allows && sinks.iter().any(|s| s.enabled && s.severity_mask & Severity::Debug as u8 != 0)
    }

    /// Core logging entry point (§4.3).
    pub fn log(&self, source: Subsystem, severity: Severity, sink_mask: u8, args: fmt::Arguments<'_>) {
        // 1. Fast path: skip Debug entirely if nothing can consume it.
        if severity == Severity::Debug && !self.debug_enabled_anywhere(source) {
            return;
        }

        // 2/3. Render and store in the circular table.
        let timestamp = crate::time::global().format_timestamp();
        let mut full_text: HString<MAX_LINE_LEN> = HString::new();
        use fmt::Write as _;
        let _ = write!(full_text, "{} [{}:{}]: ", timestamp, source.name(), severity.name());
        let mut msg_body: HString<MAX_LINE_LEN> = HString::new();
        let _ = fmt::write(&mut msg_body, args);
        let _ = full_text.push_str(&msg_body);
        let _ = full_text.push('\n');

        {
            let mut table = self.table.lock();
            if table.entries.is_full() {
                table.entries.pop_front();
            }
            let _ = table.entries.push_back(LogEntry {
                source,
                severity,
                sink_mask,
                full_text: full_text.clone(),
            });
        }

        // 4. Dispatch to each eligible sink.
        let sinks = self.sinks.lock();
        let subsystem_mask = self.subsystems.lock()[source.mask_index()].severity_mask;
        for kind in ALL_SINK_KINDS {
            let state = sinks[sink_index(kind)];
            let eligible = state.enabled
                && (kind as u8) & sink_mask != 0
                && (severity as u8) & state.severity_mask != 0
                && (severity as u8) & subsystem_mask != 0;
            if !eligible {
                continue;
            }
            let tx = match kind {
                SinkKind::Uhf => self.uhf_tx.get(),
                SinkKind::File => self.file_tx.get(),
                SinkKind::UmbilicalUart => self.umbilical_tx.get(),
            };
            if let Some(tx) = tx {
                let _ = tx.send(LogMessage { line: full_text.clone() });
            }
        }
    }

    /// Drains the in-RAM ring, oldest-first, for replay to a sink that was
    /// down when the entries were first produced.
    pub fn ring_snapshot(&self) -> heapless::Vec<LogEntry, LOG_TABLE_CAPACITY> {
        let table = self.table.lock();
        table.entries.iter().cloned().collect()
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self::new()
    }
}

fn sink_index(kind: SinkKind) -> usize {
    ALL_SINK_KINDS.iter().position(|k| *k == kind).unwrap()
}

pub static LOGGING: OnceCell<Logging> = OnceCell::new();

pub fn init() -> &'static Logging {
    LOGGING.get_or_init(Logging::new)
}

pub fn global() -> &'static Logging {
    LOGGING.get().expect("logging::init() must run before logging::global()")
}

/// Convenience macro mirroring the spec's `log(source, severity, sink_mask, format, args...)`.
#[macro_export]
macro_rules! log_msg {
    ($source:expr, $severity:expr, $sink_mask:expr, $($arg:tt)+) => {{
        $crate::logging::global().log($source, $severity, $sink_mask, format_args!($($arg)+));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sinks_except_complements_known_sinks() {
        assert_eq!(all_sinks_except(SinkKind::File as u8), (SinkKind::Uhf as u8) | (SinkKind::UmbilicalUart as u8));
    }

    #[test]
    fn debug_fast_path_skips_when_nothing_allows_debug() {
        let logging = Logging::new();
        for kind in ALL_SINK_KINDS {
            logging.set_sink_enabled(kind, false);
        }
        logging.log(Subsystem::Obc, Severity::Debug, SINK_ALL, format_args!("hello"));
        assert_eq!(logging.ring_snapshot().len(), 0);
    }

    #[test]
    fn normal_severity_always_recorded_in_ring() {
        let logging = Logging::new();
        logging.log(Subsystem::Obc, Severity::Normal, SINK_ALL, format_args!("hello {}", 1));
        let snap = logging.ring_snapshot();
        assert_eq!(snap.len(), 1);
        assert!(snap[0].full_text.contains("hello 1"));
    }

    #[test]
    fn ring_is_circular() {
        let logging = Logging::new();
        for i in 0..(LOG_TABLE_CAPACITY + 10) {
            logging.log(Subsystem::Obc, Severity::Normal, SINK_ALL, format_args!("msg {i}"));
        }
        let snap = logging.ring_snapshot();
        assert_eq!(snap.len(), LOG_TABLE_CAPACITY);
        assert!(snap[0].full_text.contains("msg 10"));
    }
}
