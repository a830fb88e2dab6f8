//! Hardware contract traits for the externals the firmware core drives but
//! does not itself implement: RBF pin, status LED, RF antenna-switch pin,
//! boom burn-wire pin, watchdog, the two antenna deployment buses, ADCS and
//! EPS handles, and the onboard filesystem. Production firmware substitutes
//! real peripheral drivers; this workspace ships `Sim*` stand-ins so the
//! rest of the crate can be exercised without hardware.

use crate::errors::OcsError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

pub trait RbfPin: Send + Sync {
    /// `true` while the remove-before-flight pin is still inserted.
    fn is_inserted(&self) -> bool;
}

pub trait StatusLed: Send + Sync {
    fn set(&self, on: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntennaSelect {
    Primary,
    Secondary,
}

pub trait RfSwitchPin: Send + Sync {
    fn select(&self, antenna: AntennaSelect);
    fn current_selection(&self) -> AntennaSelect;
}

pub trait BoomBurnPin: Send + Sync {
    fn fire(&self) -> Result<(), OcsError>;
}

pub trait Watchdog: Send + Sync {
    fn pet(&self);
}

#[async_trait]
pub trait AntennaDeployBus: Send + Sync {
    async fn send_deploy_burn(&self) -> Result<(), OcsError>;
    fn is_deployed(&self) -> bool;
}

#[async_trait]
pub trait AdcsHandle: Send + Sync {
    async fn is_healthy(&self) -> bool;
    /// Estimated roll in millidegrees, `[0, 360_000)`.
    async fn roll_millideg(&self) -> Result<u32, OcsError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpsChannel {
    Uhf,
    Adcs,
    Gps,
    Mpi,
    Boom,
    Camera,
}

#[async_trait]
pub trait EpsHandle: Send + Sync {
    async fn channel_current_ma(&self, channel: EpsChannel) -> Result<u32, OcsError>;
    async fn set_channel_enabled(&self, channel: EpsChannel, enabled: bool) -> Result<(), OcsError>;
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), OcsError>;
    /// Appends to `path`, creating it if absent. Never truncates existing content.
    async fn append_file(&self, path: &Path, data: &[u8]) -> Result<(), OcsError>;
    async fn read_file(&self, path: &Path, offset: u64, len: usize) -> Result<Vec<u8>, OcsError>;
    async fn file_len(&self, path: &Path) -> Result<u64, OcsError>;
    async fn delete_file(&self, path: &Path) -> Result<(), OcsError>;
}

// -------------------- simulated implementations --------------------

pub struct SimRbfPin(AtomicBool);
impl SimRbfPin {
    pub fn new(inserted: bool) -> Self {
        Self(AtomicBool::new(inserted))
    }
    pub fn remove(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
impl RbfPin for SimRbfPin {
    fn is_inserted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct SimStatusLed(AtomicBool);
impl SimStatusLed {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }
    pub fn is_on(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
impl Default for SimStatusLed {
    fn default() -> Self {
        Self::new()
    }
}
impl StatusLed for SimStatusLed {
    fn set(&self, on: bool) {
        self.0.store(on, Ordering::SeqCst);
    }
}

pub struct SimRfSwitchPin(AtomicU8);
impl SimRfSwitchPin {
    pub fn new() -> Self {
        Self(AtomicU8::new(0))
    }
}
impl Default for SimRfSwitchPin {
    fn default() -> Self {
        Self::new()
    }
}
impl RfSwitchPin for SimRfSwitchPin {
    fn select(&self, antenna: AntennaSelect) {
        let v = match antenna {
            AntennaSelect::Primary => 0,
            AntennaSelect::Secondary => 1,
        };
        self.0.store(v, Ordering::SeqCst);
    }
    fn current_selection(&self) -> AntennaSelect {
        match self.0.load(Ordering::SeqCst) {
            0 => AntennaSelect::Primary,
            _ => AntennaSelect::Secondary,
        }
    }
}

pub struct SimBoomBurnPin(AtomicBool);
impl SimBoomBurnPin {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }
    pub fn fired(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
impl Default for SimBoomBurnPin {
    fn default() -> Self {
        Self::new()
    }
}
impl BoomBurnPin for SimBoomBurnPin {
    fn fire(&self) -> Result<(), OcsError> {
        self.0.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct SimWatchdog(AtomicU8);
impl SimWatchdog {
    pub fn new() -> Self {
        Self(AtomicU8::new(0))
    }
    pub fn pet_count(&self) -> u8 {
        self.0.load(Ordering::SeqCst)
    }
}
impl Default for SimWatchdog {
    fn default() -> Self {
        Self::new()
    }
}
impl Watchdog for SimWatchdog {
    fn pet(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct SimAntennaDeployBus {
    deployed: AtomicBool,
}
impl SimAntennaDeployBus {
    pub fn new() -> Self {
        Self {
            deployed: AtomicBool::new(false),
        }
    }
}
impl Default for SimAntennaDeployBus {
    fn default() -> Self {
        Self::new()
    }
}
#[async_trait]
impl AntennaDeployBus for SimAntennaDeployBus {
    async fn send_deploy_burn(&self) -> Result<(), OcsError> {
        self.deployed.store(true, Ordering::SeqCst);
        Ok(())
    }
    fn is_deployed(&self) -> bool {
        self.deployed.load(Ordering::SeqCst)
    }
}

pub struct SimAdcsHandle {
    healthy: AtomicBool,
    roll_millideg: AtomicU32,
}
impl SimAdcsHandle {
    pub fn new(healthy: bool) -> Self {
        Self {
            healthy: AtomicBool::new(healthy),
            roll_millideg: AtomicU32::new(0),
        }
    }
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
    pub fn set_roll_millideg(&self, roll: u32) {
        self.roll_millideg.store(roll, Ordering::SeqCst);
    }
}
#[async_trait]
impl AdcsHandle for SimAdcsHandle {
    async fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
    async fn roll_millideg(&self) -> Result<u32, OcsError> {
        Ok(self.roll_millideg.load(Ordering::SeqCst))
    }
}

pub struct SimEpsHandle {
    enabled: RwLock<[bool; 6]>,
}
impl SimEpsHandle {
    pub fn new() -> Self {
        Self {
            enabled: RwLock::new([true; 6]),
        }
    }
    fn idx(channel: EpsChannel) -> usize {
        match channel {
            EpsChannel::Uhf => 0,
            EpsChannel::Adcs => 1,
            EpsChannel::Gps => 2,
            EpsChannel::Mpi => 3,
            EpsChannel::Boom => 4,
            EpsChannel::Camera => 5,
        }
    }
}
impl Default for SimEpsHandle {
    fn default() -> Self {
        Self::new()
    }
}
#[async_trait]
impl EpsHandle for SimEpsHandle {
    async fn channel_current_ma(&self, channel: EpsChannel) -> Result<u32, OcsError> {
        let on = self.enabled.read()[Self::idx(channel)];
        Ok(if on { 120 } else { 0 })
    }
    async fn set_channel_enabled(&self, channel: EpsChannel, enabled: bool) -> Result<(), OcsError> {
        self.enabled.write()[Self::idx(channel)] = enabled;
        Ok(())
    }
}

pub struct TokioFileSystem {
    root: PathBuf,
}
impl TokioFileSystem {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}
#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), OcsError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(full, data).await?;
        Ok(())
    }

    async fn append_file(&self, path: &Path, data: &[u8]) -> Result<(), OcsError> {
        use tokio::io::AsyncWriteExt;
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut f = tokio::fs::OpenOptions::new().create(true).append(true).open(full).await?;
        f.write_all(data).await?;
        Ok(())
    }

    async fn read_file(&self, path: &Path, offset: u64, len: usize) -> Result<Vec<u8>, OcsError> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};
        let mut f = tokio::fs::File::open(self.resolve(path)).await?;
        f.seek(std::io::SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; len];
        let n = f.read(&mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }

    async fn file_len(&self, path: &Path) -> Result<u64, OcsError> {
        let meta = tokio::fs::metadata(self.resolve(path)).await?;
        Ok(meta.len())
    }

    async fn delete_file(&self, path: &Path) -> Result<(), OcsError> {
        tokio::fs::remove_file(self.resolve(path)).await?;
        Ok(())
    }
}

/// All hardware collaborators the rest of the crate needs, bundled so a
/// `main.rs` can build a real set or an all-`Sim*` set with one call site.
pub struct Hardware {
    pub rbf: Arc<dyn RbfPin>,
    pub led: Arc<dyn StatusLed>,
    pub rf_switch: Arc<dyn RfSwitchPin>,
    pub boom_burn: Arc<dyn BoomBurnPin>,
    pub watchdog: Arc<dyn Watchdog>,
    pub deploy_bus_1: Arc<dyn AntennaDeployBus>,
    pub deploy_bus_2: Arc<dyn AntennaDeployBus>,
    pub adcs: Arc<dyn AdcsHandle>,
    pub eps: Arc<dyn EpsHandle>,
    pub fs: Arc<dyn FileSystem>,
}

impl Hardware {
    pub fn simulated(data_dir: PathBuf) -> Self {
        Self {
            rbf: Arc::new(SimRbfPin::new(false)),
            led: Arc::new(SimStatusLed::new()),
            rf_switch: Arc::new(SimRfSwitchPin::new()),
            boom_burn: Arc::new(SimBoomBurnPin::new()),
            watchdog: Arc::new(SimWatchdog::new()),
            deploy_bus_1: Arc::new(SimAntennaDeployBus::new()),
            deploy_bus_2: Arc::new(SimAntennaDeployBus::new()),
            adcs: Arc::new(SimAdcsHandle::new(true)),
            eps: Arc::new(SimEpsHandle::new()),
            fs: Arc::new(TokioFileSystem::new(data_dir)),
        }
    }
}
