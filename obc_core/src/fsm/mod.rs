//! Bootup / operation FSM (§4.7): priority-ordered state transitions driven
//! by an LED-indication cadence, grounded on
//! `rtos_bootup_operation_fsm_task.c`'s transition order and antenna
//! deployment sequence.

use crate::hw::{AntennaDeployBus, RbfPin, StatusLed};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    BootedAndWaiting,
    Deploying,
    NominalWithRadioTx,
    NominalWithoutRadioTx,
}

pub struct FsmConfig {
    pub ant_deploy_startup: Duration,
    pub deploying_max_duration: Duration,
}

impl Default for FsmConfig {
    fn default() -> Self {
        Self {
            ant_deploy_startup: Duration::from_secs(1800),
            deploying_max_duration: Duration::from_secs(4 * 3600),
        }
    }
}

pub struct Fsm {
    state: std::sync::Mutex<OperationState>,
    boot_instant: Instant,
    rbf: Arc<dyn RbfPin>,
    led: Arc<dyn StatusLed>,
    deploy_bus_1: Arc<dyn AntennaDeployBus>,
    deploy_bus_2: Arc<dyn AntennaDeployBus>,
    bypass_file: std::path::PathBuf,
    uplink_received: Arc<AtomicBool>,
    cfg: FsmConfig,
    deploying_since: std::sync::Mutex<Option<Instant>>,
}

impl Fsm {
    pub fn new(
        rbf: Arc<dyn RbfPin>,
        led: Arc<dyn StatusLed>,
        deploy_bus_1: Arc<dyn AntennaDeployBus>,
        deploy_bus_2: Arc<dyn AntennaDeployBus>,
        bypass_file: std::path::PathBuf,
        uplink_received: Arc<AtomicBool>,
        cfg: FsmConfig,
    ) -> Self {
        Self {
            state: std::sync::Mutex::new(OperationState::BootedAndWaiting),
            boot_instant: Instant::now(),
            rbf,
            led,
            deploy_bus_1,
            deploy_bus_2,
            bypass_file,
            uplink_received,
            cfg,
            deploying_since: std::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> OperationState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, new_state: OperationState) {
        let mut state = self.state.lock().unwrap();
        if *state != new_state {
            tracing::info!(?state, ?new_state, "FSM transition");
            *state = new_state;
        }
    }

    fn uptime(&self) -> Duration {
        self.boot_instant.elapsed()
    }

    fn all_antennas_deployed(&self) -> bool {
        // Either redundant I2C bus reporting all-deployed is sufficient; a
        // dead sensor link on one bus must not block a successful deployment.
        self.deploy_bus_1.is_deployed() || self.deploy_bus_2.is_deployed()
    }

    /// Runs the 12-pulse lengthening "just booted" indicator once, then
    /// drives the transition/LED loop forever.
    pub async fn run(self: Arc<Self>) {
        for i in 0..12u64 {
            self.led.set(true);
            tokio::time::sleep(Duration::from_millis(100 + 25 * i)).await;
            self.led.set(false);
            tokio::task::yield_now().await;
        }

        loop {
            self.evaluate_transitions().await;
            self.led_phase().await;
        }
    }

    async fn evaluate_transitions(&self) {
        // Common checks, every state.
        if self.uplink_received.load(Ordering::SeqCst) {
            self.set_state(OperationState::NominalWithRadioTx);
            return;
        }
        if !self.rbf.is_inserted() {
            // RBF pin removed means flying; "BENCH" is pin still inserted.
        } else {
            self.set_state(OperationState::NominalWithoutRadioTx);
            return;
        }
        if self.bypass_file.exists() {
            self.set_state(OperationState::NominalWithRadioTx);
            return;
        }

        match self.state() {
            OperationState::BootedAndWaiting => {
                if !self.rbf.is_inserted() && self.uptime() >= self.cfg.ant_deploy_startup {
                    self.set_state(OperationState::Deploying);
                    *self.deploying_since.lock().unwrap() = Some(Instant::now());
                    return;
                }
                if self.all_antennas_deployed() {
                    self.set_state(OperationState::NominalWithRadioTx);
                }
            }
            OperationState::Deploying => {
                if self.all_antennas_deployed() {
                    self.set_state(OperationState::NominalWithRadioTx);
                    return;
                }
                let since = self.deploying_since.lock().unwrap().unwrap_or_else(Instant::now);
                if since.elapsed() >= self.cfg.deploying_max_duration {
                    self.set_state(OperationState::NominalWithRadioTx);
                    return;
                }
                self.run_deployment_attempt(since).await;
            }
            OperationState::NominalWithRadioTx | OperationState::NominalWithoutRadioTx => {}
        }
    }

    /// Alternates between the two redundant I²C buses every 30 s, per bus:
    /// power on, arm, issue deploy, 30 s timeout on the call itself.
    async fn run_deployment_attempt(&self, since: Instant) {
        let elapsed_windows = since.elapsed().as_secs() / 30;
        let use_bus_1 = elapsed_windows % 2 == 0;
        let bus: &Arc<dyn AntennaDeployBus> = if use_bus_1 { &self.deploy_bus_1 } else { &self.deploy_bus_2 };

        let attempt = bus.send_deploy_burn();
        let _ = tokio::time::timeout(Duration::from_secs(30), attempt).await;
    }

    async fn led_phase(&self) {
        match self.state() {
            OperationState::BootedAndWaiting => {
                let remaining = self.cfg.ant_deploy_startup.checked_sub(self.uptime());
                let period = match remaining {
                    Some(r) if r > Duration::from_secs(300) => Duration::from_millis(1000),
                    _ => Duration::from_millis(333),
                };
                self.pulse(Duration::from_millis(40), period).await;
            }
            OperationState::Deploying => {
                self.led.set(true);
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            OperationState::NominalWithRadioTx => {
                self.pulse(Duration::from_millis(40), Duration::from_millis(10_000)).await;
            }
            OperationState::NominalWithoutRadioTx => {
                self.led.set(true);
                tokio::time::sleep(Duration::from_millis(40)).await;
                self.led.set(false);
                tokio::time::sleep(Duration::from_millis(40)).await;
                self.led.set(true);
                tokio::time::sleep(Duration::from_millis(40)).await;
                self.led.set(false);
                tokio::time::sleep(Duration::from_millis(3000 - 120)).await;
            }
        }
    }

    async fn pulse(&self, on_time: Duration, period: Duration) {
        self.led.set(true);
        tokio::time::sleep(on_time).await;
        self.led.set(false);
        tokio::time::sleep(period.saturating_sub(on_time)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::{SimAntennaDeployBus, SimRbfPin, SimStatusLed};

    fn test_fsm(rbf_inserted: bool) -> Fsm {
        Fsm::new(
            Arc::new(SimRbfPin::new(rbf_inserted)),
            Arc::new(SimStatusLed::new()),
            Arc::new(SimAntennaDeployBus::new()),
            Arc::new(SimAntennaDeployBus::new()),
            std::env::temp_dir().join("obc_fsm_test_nonexistent_bypass_file"),
            Arc::new(AtomicBool::new(false)),
            FsmConfig::default(),
        )
    }

    #[tokio::test]
    async fn rbf_inserted_forces_nominal_without_radio() {
        let fsm = test_fsm(true);
        fsm.evaluate_transitions().await;
        assert_eq!(fsm.state(), OperationState::NominalWithoutRadioTx);
    }

    #[tokio::test]
    async fn uplink_received_wins_over_everything() {
        let fsm = test_fsm(true);
        fsm.uplink_received.store(true, Ordering::SeqCst);
        fsm.evaluate_transitions().await;
        assert_eq!(fsm.state(), OperationState::NominalWithRadioTx);
    }

    #[tokio::test]
    async fn antennas_deployed_moves_to_nominal_with_radio() {
        let fsm = test_fsm(false);
        fsm.deploy_bus_1.send_deploy_burn().await.unwrap();
        fsm.deploy_bus_2.send_deploy_burn().await.unwrap();
        fsm.evaluate_transitions().await;
        assert_eq!(fsm.state(), OperationState::NominalWithRadioTx);
    }

    #[tokio::test]
    async fn monotonic_once_nominal_with_radio_stays_there() {
        let fsm = test_fsm(false);
        fsm.uplink_received.store(true, Ordering::SeqCst);
        fsm.evaluate_transitions().await;
        assert_eq!(fsm.state(), OperationState::NominalWithRadioTx);
        fsm.uplink_received.store(false, Ordering::SeqCst);
        fsm.evaluate_transitions().await;
        assert_eq!(fsm.state(), OperationState::NominalWithRadioTx);
    }
}
