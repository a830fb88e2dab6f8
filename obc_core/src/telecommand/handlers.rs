//! Concrete telecommand handlers (§3.5 supplement). Each matches the
//! `HandlerFn` signature and runs synchronously on the executor task; work
//! needing `.await` is handed off to a detached task.

use super::definitions::lookup_by_name;
use super::TelecommandContext;
use crate::hw::EpsChannel;
use crate::logging::{self, Severity, Subsystem};
use crate::rf_switch::ControlMode;
use crate::time::EpochSource;
use obc_wire::args;
use obc_wire::frame::Channel;
use std::fmt::Write as _;

type Resp = heapless::String<256>;

pub fn hello_world(_args: &str, _channel: Channel, resp: &mut Resp, _ctx: &TelecommandContext) -> u8 {
    let _ = resp.push_str("hello");
    0
}

pub fn echo_back_args(args_str: &str, _channel: Channel, resp: &mut Resp, _ctx: &TelecommandContext) -> u8 {
    let mut out: heapless::String<200> = heapless::String::new();
    match args::extract_string::<200>(args_str, 0, &mut out) {
        Ok(()) => {
            let _ = resp.push_str(out.as_str());
            0
        }
        Err(_) => {
            let _ = resp.push_str("bad args");
            1
        }
    }
}

pub fn set_time(args_str: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    match args::extract_u64(args_str, 0) {
        Ok(epoch_ms) => {
            let regressed = ctx.time.set_epoch_ms(epoch_ms, EpochSource::Telecommand);
            if regressed {
                logging::global().log(
                    Subsystem::Telecommand,
                    Severity::Warning,
                    logging::SINK_ALL,
                    format_args!("set_time: new epoch regresses relative to previous sync"),
                );
            }
            let _ = write!(resp, "epoch set to {epoch_ms}");
            0
        }
        Err(_) => {
            let _ = resp.push_str("bad args");
            1
        }
    }
}

pub fn correct_time(args_str: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    match args::extract_u64(args_str, 0) {
        Ok(epoch_ms) => {
            ctx.time.set_epoch_ms(epoch_ms, EpochSource::TelecommandCorrection);
            let _ = write!(resp, "epoch corrected to {epoch_ms}");
            0
        }
        Err(_) => {
            let _ = resp.push_str("bad args");
            1
        }
    }
}

pub fn delete_tcmd_by_ts_sent(args_str: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    match args::extract_u64(args_str, 0) {
        Ok(ts_sent) => {
            let n = ctx.agenda.delete_by_ts_sent(ts_sent);
            let _ = write!(resp, "deleted {n}");
            0
        }
        Err(_) => {
            let _ = resp.push_str("bad args");
            1
        }
    }
}

pub fn delete_tcmd_by_name(args_str: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    let mut name: heapless::String<64> = heapless::String::new();
    if args::extract_string::<64>(args_str, 0, &mut name).is_err() {
        let _ = resp.push_str("bad args");
        return 1;
    }
    match lookup_by_name(name.as_str()) {
        Some((def_index, _)) => {
            let n = ctx.agenda.delete_by_def_index(def_index);
            let _ = write!(resp, "deleted {n}");
            0
        }
        None => {
            let _ = resp.push_str("unknown name");
            1
        }
    }
}

pub fn delete_all_tcmds_from_agenda(
    _args: &str,
    _channel: Channel,
    resp: &mut Resp,
    ctx: &TelecommandContext,
) -> u8 {
    let n = ctx.agenda.delete_all();
    let _ = write!(resp, "deleted {n}");
    0
}

pub fn fetch_tcmd_agenda(_args: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    let summaries = ctx.agenda.fetch_summaries();
    for summary in &summaries {
        logging::global().log(
            Subsystem::Telecommand,
            Severity::Normal,
            logging::SINK_ALL,
            format_args!("{summary}"),
        );
    }
    let _ = write!(resp, "{} entries", summaries.len());
    0
}

pub fn set_log_sink_enabled(args_str: &str, _channel: Channel, resp: &mut Resp, _ctx: &TelecommandContext) -> u8 {
    let sink_code = match args::extract_u64(args_str, 0) {
        Ok(v) => v,
        Err(_) => {
            let _ = resp.push_str("bad args");
            return 1;
        }
    };
    let enabled_code = match args::extract_u64(args_str, 1) {
        Ok(v) => v,
        Err(_) => {
            let _ = resp.push_str("bad args");
            return 1;
        }
    };
    let kind = match sink_code {
        0 => logging::SinkKind::Uhf,
        1 => logging::SinkKind::File,
        2 => logging::SinkKind::UmbilicalUart,
        _ => {
            let _ = resp.push_str("unknown sink");
            return 1;
        }
    };
    logging::global().set_sink_enabled(kind, enabled_code != 0);
    let _ = resp.push_str("ok");
    0
}

pub fn set_subsystem_severity_mask(
    args_str: &str,
    _channel: Channel,
    resp: &mut Resp,
    _ctx: &TelecommandContext,
) -> u8 {
    let subsystem_code = match args::extract_u64(args_str, 0) {
        Ok(v) => v,
        Err(_) => {
            let _ = resp.push_str("bad args");
            return 1;
        }
    };
    let mask = match args::extract_u64(args_str, 1) {
        Ok(v) => v as u8,
        Err(_) => {
            let _ = resp.push_str("bad args");
            return 1;
        }
    };
    let Some(subsystem) = Subsystem::ALL.get(subsystem_code as usize).copied() else {
        let _ = resp.push_str("unknown subsystem");
        return 1;
    };
    logging::global().set_subsystem_severity_mask(subsystem, mask);
    let _ = resp.push_str("ok");
    0
}

pub fn set_rf_switch_mode(args_str: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    let mode_code = match args::extract_u64(args_str, 0) {
        Ok(v) => v,
        Err(_) => {
            let _ = resp.push_str("bad args");
            return 1;
        }
    };
    let mode = match mode_code {
        0 => ControlMode::ToggleEveryBeacon,
        1 => ControlMode::ForceAnt1,
        2 => ControlMode::ForceAnt2,
        3 => ControlMode::UseAdcsNormal,
        4 => ControlMode::UseAdcsFlipped,
        _ => {
            let _ = resp.push_str("unknown mode");
            return 1;
        }
    };
    ctx.rf_switch.set_mode(mode);
    let _ = resp.push_str("ok");
    0
}

pub fn start_bulk_downlink(args_str: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    let mut path: heapless::String<128> = heapless::String::new();
    if args::extract_string::<128>(args_str, 0, &mut path).is_err() {
        let _ = resp.push_str("bad args");
        return 1;
    }
    let start_offset = match args::extract_u64(args_str, 1) {
        Ok(v) => v,
        Err(_) => {
            let _ = resp.push_str("bad args");
            return 1;
        }
    };
    let max_bytes = match args::extract_u64(args_str, 2) {
        Ok(v) => v,
        Err(_) => {
            let _ = resp.push_str("bad args");
            return 1;
        }
    };

    let bulk = ctx.bulk.clone();
    let path_buf = std::path::PathBuf::from(path.as_str());
    tokio::spawn(async move {
        if let Err(e) = bulk.start(path_buf, start_offset, max_bytes).await {
            logging::global().log(
                Subsystem::FileSystem,
                Severity::Error,
                logging::all_sinks_except(0),
                format_args!("start_bulk_downlink failed: {e}"),
            );
        }
    });
    let _ = resp.push_str("starting");
    0
}

pub fn pause_bulk_downlink(_args: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    match ctx.bulk.pause() {
        Ok(()) => {
            let _ = resp.push_str("paused");
            0
        }
        Err(e) => {
            let _ = write!(resp, "{e}");
            1
        }
    }
}

pub fn resume_bulk_downlink(_args: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    match ctx.bulk.resume() {
        Ok(()) => {
            let _ = resp.push_str("resumed");
            0
        }
        Err(e) => {
            let _ = write!(resp, "{e}");
            1
        }
    }
}

pub fn reboot(_args: &str, _channel: Channel, resp: &mut Resp, _ctx: &TelecommandContext) -> u8 {
    logging::global().log(
        Subsystem::Obc,
        Severity::Critical,
        logging::SINK_ALL,
        format_args!("reboot requested by telecommand"),
    );
    let _ = resp.push_str("rebooting");
    0
}

pub fn run_safe_mode_check(_args: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    let eps = ctx.hw.eps.clone();
    tokio::spawn(async move {
        let battery_pct = 100;
        crate::supervisor::check_safe_mode(&eps, battery_pct, false).await;
    });
    let _ = resp.push_str("checked");
    0
}

pub fn enter_safe_mode(_args: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    let eps = ctx.hw.eps.clone();
    tokio::spawn(async move {
        crate::supervisor::enter_safe_mode(&eps).await;
    });
    let _ = resp.push_str("entering safe mode");
    0
}

pub fn exit_safe_mode(_args: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    let eps = ctx.hw.eps.clone();
    tokio::spawn(async move {
        crate::supervisor::exit_safe_mode(&eps).await;
    });
    let _ = resp.push_str("exiting safe mode");
    0
}

fn channel_from_code(code: u64) -> Option<EpsChannel> {
    match code {
        0 => Some(EpsChannel::Uhf),
        1 => Some(EpsChannel::Adcs),
        2 => Some(EpsChannel::Gps),
        3 => Some(EpsChannel::Mpi),
        4 => Some(EpsChannel::Boom),
        5 => Some(EpsChannel::Camera),
        _ => None,
    }
}

pub fn set_eps_channel_enabled(args_str: &str, _channel: Channel, resp: &mut Resp, ctx: &TelecommandContext) -> u8 {
    let channel_code = match args::extract_u64(args_str, 0) {
        Ok(v) => v,
        Err(_) => {
            let _ = resp.push_str("bad args");
            return 1;
        }
    };
    let enabled_code = match args::extract_u64(args_str, 1) {
        Ok(v) => v,
        Err(_) => {
            let _ = resp.push_str("bad args");
            return 1;
        }
    };
    let Some(channel) = channel_from_code(channel_code) else {
        let _ = resp.push_str("unknown channel");
        return 1;
    };
    let eps = ctx.hw.eps.clone();
    let enabled = enabled_code != 0;
    tokio::spawn(async move {
        if let Err(e) = eps.set_channel_enabled(channel, enabled).await {
            logging::global().log(
                Subsystem::Eps,
                Severity::Error,
                logging::SINK_ALL,
                format_args!("set_eps_channel_enabled: {e}"),
            );
        }
    });
    let _ = resp.push_str("ok");
    0
}
