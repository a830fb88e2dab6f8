// Command line interface + runtime configuration (mission parameters, ports, paths)
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub radio_bind_addr: String,
    pub radio_peer_addr: String,
    pub debug_uart_bind_addr: String,
    pub debug_uart_peer_addr: String,
    pub device_prefix: String,
    pub data_dir: PathBuf,

    pub ant_deploy_startup_sec: u64,
    pub max_no_uplink_sec: u64,
    pub eps_monitor_interval_ms: u64,
    pub stm32_system_reset_interval_ms: u64,
    pub bulk_downlink_delay_per_packet_ms: u64,
    pub tcmd_require_unique_tssent: bool,
    pub ax100_downlink_max_bytes: usize,

    pub log_sync_interval_ms: u64,
    pub log_close_interval_ms: u64,
    pub supervisor_cadence_ms: u64,
}

#[derive(Parser, Debug, Clone)]
pub struct Cli {
    #[arg(long, default_value = "0.0.0.0:7890")]
    pub radio_bind_addr: String,
    #[arg(long, default_value = "127.0.0.1:7891")]
    pub radio_peer_addr: String,
    #[arg(long, default_value = "0.0.0.0:7990")]
    pub debug_uart_bind_addr: String,
    #[arg(long, default_value = "127.0.0.1:7991")]
    pub debug_uart_peer_addr: String,
    #[arg(long, default_value = "CTS1+")]
    pub device_prefix: String,
    #[arg(long, default_value = "./obc_data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value_t = 1800)]
    pub ant_deploy_startup_sec: u64,
    #[arg(long, default_value_t = 21600)]
    pub max_no_uplink_sec: u64,
    #[arg(long, default_value_t = 60_000)]
    pub eps_monitor_interval_ms: u64,
    #[arg(long, default_value_t = 7 * 24 * 3_600_000)]
    pub stm32_system_reset_interval_ms: u64,
    #[arg(long, default_value_t = 208)]
    pub bulk_downlink_delay_per_packet_ms: u64,
    #[arg(long, default_value_t = true)]
    pub tcmd_require_unique_tssent: bool,
    #[arg(long, default_value_t = 200)]
    pub ax100_downlink_max_bytes: usize,

    #[arg(long, default_value_t = 15_000)]
    pub log_sync_interval_ms: u64,
    #[arg(long, default_value_t = 30_000)]
    pub log_close_interval_ms: u64,
    #[arg(long, default_value_t = 3_000)]
    pub supervisor_cadence_ms: u64,
}

impl Cli {
    pub fn parse_and_build_config() -> Result<Config> {
        let c = <Cli as Parser>::parse();
        Ok(Config {
            radio_bind_addr: c.radio_bind_addr,
            radio_peer_addr: c.radio_peer_addr,
            debug_uart_bind_addr: c.debug_uart_bind_addr,
            debug_uart_peer_addr: c.debug_uart_peer_addr,
            device_prefix: c.device_prefix,
            data_dir: c.data_dir,
            ant_deploy_startup_sec: c.ant_deploy_startup_sec,
            max_no_uplink_sec: c.max_no_uplink_sec,
            eps_monitor_interval_ms: c.eps_monitor_interval_ms,
            stm32_system_reset_interval_ms: c.stm32_system_reset_interval_ms,
            bulk_downlink_delay_per_packet_ms: c.bulk_downlink_delay_per_packet_ms,
            tcmd_require_unique_tssent: c.tcmd_require_unique_tssent,
            ax100_downlink_max_bytes: c.ax100_downlink_max_bytes,
            log_sync_interval_ms: c.log_sync_interval_ms,
            log_close_interval_ms: c.log_close_interval_ms,
            supervisor_cadence_ms: c.supervisor_cadence_ms,
        })
    }
}
