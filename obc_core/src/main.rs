// src/main.rs
mod config;
mod downlink;
mod errors;
mod fsm;
mod hw;
mod logging;
mod net;
mod rf_switch;
mod supervisor;
mod telecommand;
mod time;

use anyhow::Result;
use obc_wire::frame::Channel;
use obc_wire::packet::PacketType;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("obc_core=info".parse().unwrap())
                .add_directive("obc_wire=info".parse().unwrap())
                .add_directive("tokio=warn".parse().unwrap()),
        )
        .compact()
        .init();

    let cfg = config::Cli::parse_and_build_config()?;
    info!(?cfg, "OBC firmware core starting");

    time::init();
    let logging = logging::init();
    let hardware = Arc::new(hw::Hardware::simulated(cfg.data_dir.clone()));

    // -------- log sinks ----------
    let (file_tx, file_rx) = tokio::sync::mpsc::unbounded_channel();
    logging.connect_file_sink(file_tx);
    tokio::spawn(logging::file_sink::run(
        file_rx,
        logging::file_sink::FileSinkConfig {
            data_dir: cfg.data_dir.clone(),
            sync_interval: std::time::Duration::from_millis(cfg.log_sync_interval_ms),
            close_interval: std::time::Duration::from_millis(cfg.log_close_interval_ms),
        },
    ));

    // -------- radio (UHF) and debug UART sockets ----------
    let radio_sock = Arc::new(net::bind(&cfg.radio_bind_addr).await?);
    radio_sock.connect(&cfg.radio_peer_addr).await?;
    let debug_sock = Arc::new(net::bind(&cfg.debug_uart_bind_addr).await?);
    debug_sock.connect(&cfg.debug_uart_peer_addr).await?;

    let radio_downlink_tx = downlink::spawn_udp_sink(radio_sock.clone());
    let downlink = downlink::Downlink::new(None, radio_downlink_tx);

    let (uhf_tx, mut uhf_rx) = tokio::sync::mpsc::unbounded_channel();
    logging.connect_uhf_sink(uhf_tx);
    let uhf_downlink = downlink.clone();
    tokio::spawn(async move {
        while let Some(msg) = uhf_rx.recv().await {
            uhf_downlink.send_packet(PacketType::LogMessage, msg.line.as_bytes());
        }
    });

    let (umbilical_tx, mut umbilical_rx) = tokio::sync::mpsc::unbounded_channel();
    logging.connect_umbilical_sink(umbilical_tx);
    let umbilical_sock = debug_sock.clone();
    tokio::spawn(async move {
        while let Some(msg) = umbilical_rx.recv().await {
            if let Err(e) = umbilical_sock.send(msg.line.as_bytes()).await {
                warn!(?e, "umbilical UART sink: send failed");
            }
        }
    });

    // -------- telecommand pipeline ----------
    let device_prefix: &'static str = Box::leak(cfg.device_prefix.clone().into_boxed_str());
    let agenda = Arc::new(telecommand::agenda::AgendaT::new(cfg.tcmd_require_unique_tssent));
    let rf_switch_state = Arc::new(rf_switch::RfSwitchState::new());
    let bulk = Arc::new(downlink::bulk::BulkDownlinkTask::new(
        hardware.fs.clone(),
        downlink.clone(),
        cfg.bulk_downlink_delay_per_packet_ms,
        cfg.ax100_downlink_max_bytes,
    ));
    let uplink_received = Arc::new(AtomicBool::new(false));

    let ctx = telecommand::TelecommandContext {
        time: time::global(),
        agenda: agenda.clone(),
        rf_switch: rf_switch_state.clone(),
        bulk: bulk.clone(),
        downlink: downlink.clone(),
        hw: hardware.clone(),
        uplink_received: uplink_received.clone(),
        device_prefix,
    };

    tokio::spawn(net::spawn_rx_task(
        radio_sock.clone(),
        Channel::Radio1,
        device_prefix.to_string(),
        agenda.clone(),
    ));
    tokio::spawn(net::spawn_rx_task(
        debug_sock.clone(),
        Channel::DebugUart,
        device_prefix.to_string(),
        agenda.clone(),
    ));

    tokio::spawn(telecommand::executor::run(telecommand::definitions::TABLE, ctx));
    tokio::spawn(bulk.clone().run());

    // -------- FSM + supervisor ----------
    let fsm = Arc::new(fsm::Fsm::new(
        hardware.rbf.clone(),
        hardware.led.clone(),
        hardware.deploy_bus_1.clone(),
        hardware.deploy_bus_2.clone(),
        cfg.data_dir.join("bypass_deployment_and_enable_radio.txt"),
        uplink_received.clone(),
        fsm::FsmConfig {
            ant_deploy_startup: std::time::Duration::from_secs(cfg.ant_deploy_startup_sec),
            ..Default::default()
        },
    ));
    tokio::spawn(fsm.run());

    let supervisor = Arc::new(supervisor::Supervisor {
        time: time::global(),
        eps: hardware.eps.clone(),
        rf_switch: rf_switch_state.clone(),
        rf_switch_pin: hardware.rf_switch.clone(),
        adcs: hardware.adcs.clone(),
        downlink,
        watchdog: supervisor::WatchdogPetter::new(hardware.watchdog.clone()),
        cfg: supervisor::SupervisorConfig {
            cadence: std::time::Duration::from_millis(cfg.supervisor_cadence_ms),
            eps_monitor_interval: std::time::Duration::from_millis(cfg.eps_monitor_interval_ms),
            stm32_system_reset_interval: std::time::Duration::from_millis(cfg.stm32_system_reset_interval_ms),
            max_no_uplink_sec: cfg.max_no_uplink_sec,
            log_sync_interval: std::time::Duration::from_millis(cfg.log_sync_interval_ms),
            log_close_interval: std::time::Duration::from_millis(cfg.log_close_interval_ms),
        },
    });
    tokio::spawn(supervisor.run());

    info!("OBC firmware core running. Press Ctrl+C to stop...");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(?e, "failed to install Ctrl+C handler");
    }
    info!("shutdown signal received; exiting.");
    Ok(())
}
