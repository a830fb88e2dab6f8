//! Static telecommand table (§3: "static, compile-time table"). Recovered
//! and scaled down from `original_source/firmware/Core/Inc/telecommands/*`.

use super::handlers;
use super::{Readiness, TelecommandDef};
use obc_wire::frame::TelecommandLookup;

pub static TABLE: &[TelecommandDef] = &[
    TelecommandDef {
        name: "hello_world",
        arg_count: 0,
        readiness: Readiness::Operational,
        handler: handlers::hello_world,
    },
    TelecommandDef {
        name: "echo_back_args",
        arg_count: 1,
        readiness: Readiness::GroundOnly,
        handler: handlers::echo_back_args,
    },
    TelecommandDef {
        name: "set_time",
        arg_count: 1,
        readiness: Readiness::Operational,
        handler: handlers::set_time,
    },
    TelecommandDef {
        name: "correct_time",
        arg_count: 1,
        readiness: Readiness::Operational,
        handler: handlers::correct_time,
    },
    TelecommandDef {
        name: "delete_tcmd_by_ts_sent",
        arg_count: 1,
        readiness: Readiness::Operational,
        handler: handlers::delete_tcmd_by_ts_sent,
    },
    TelecommandDef {
        name: "delete_tcmd_by_name",
        arg_count: 1,
        readiness: Readiness::Operational,
        handler: handlers::delete_tcmd_by_name,
    },
    TelecommandDef {
        name: "delete_all_tcmds_from_agenda",
        arg_count: 0,
        readiness: Readiness::Operational,
        handler: handlers::delete_all_tcmds_from_agenda,
    },
    TelecommandDef {
        name: "fetch_tcmd_agenda",
        arg_count: 0,
        readiness: Readiness::Operational,
        handler: handlers::fetch_tcmd_agenda,
    },
    TelecommandDef {
        name: "set_log_sink_enabled",
        arg_count: 2,
        readiness: Readiness::Operational,
        handler: handlers::set_log_sink_enabled,
    },
    TelecommandDef {
        name: "set_subsystem_severity_mask",
        arg_count: 2,
        readiness: Readiness::Operational,
        handler: handlers::set_subsystem_severity_mask,
    },
    TelecommandDef {
        name: "set_rf_switch_mode",
        arg_count: 1,
        readiness: Readiness::Operational,
        handler: handlers::set_rf_switch_mode,
    },
    TelecommandDef {
        name: "start_bulk_downlink",
        arg_count: 3,
        readiness: Readiness::Operational,
        handler: handlers::start_bulk_downlink,
    },
    TelecommandDef {
        name: "pause_bulk_downlink",
        arg_count: 0,
        readiness: Readiness::Operational,
        handler: handlers::pause_bulk_downlink,
    },
    TelecommandDef {
        name: "resume_bulk_downlink",
        arg_count: 0,
        readiness: Readiness::Operational,
        handler: handlers::resume_bulk_downlink,
    },
    TelecommandDef {
        name: "reboot",
        arg_count: 0,
        readiness: Readiness::FlightTesting,
        handler: handlers::reboot,
    },
    TelecommandDef {
        name: "run_safe_mode_check",
        arg_count: 0,
        readiness: Readiness::Operational,
        handler: handlers::run_safe_mode_check,
    },
    TelecommandDef {
        name: "enter_safe_mode",
        arg_count: 0,
        readiness: Readiness::Operational,
        handler: handlers::enter_safe_mode,
    },
    TelecommandDef {
        name: "exit_safe_mode",
        arg_count: 0,
        readiness: Readiness::Operational,
        handler: handlers::exit_safe_mode,
    },
    TelecommandDef {
        name: "set_eps_channel_enabled",
        arg_count: 2,
        readiness: Readiness::Operational,
        handler: handlers::set_eps_channel_enabled,
    },
];

pub fn lookup_by_name(name: &str) -> Option<(u8, u8)> {
    TABLE
        .iter()
        .position(|d| d.name == name)
        .map(|idx| (idx as u8, TABLE[idx].arg_count))
}

pub struct StaticTable;

impl TelecommandLookup for StaticTable {
    fn resolve(&self, name: &str) -> Option<(u8, u8)> {
        lookup_by_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_def_resolves_to_its_own_index() {
        for (idx, def) in TABLE.iter().enumerate() {
            assert_eq!(lookup_by_name(def.name), Some((idx as u8, def.arg_count)));
        }
    }
}
