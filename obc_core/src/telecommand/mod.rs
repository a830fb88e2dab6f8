//! Telecommand definitions, agenda, and executor (§4.5/§4.6).

pub mod agenda;
pub mod definitions;
pub mod executor;
pub mod handlers;

use crate::downlink::bulk::BulkDownlinkTask;
use crate::downlink::Downlink;
use crate::hw::Hardware;
use crate::rf_switch::RfSwitchState;
use crate::time::TimeService;
use obc_wire::frame::Channel;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Idea,
    NotImplemented,
    InProgress,
    GroundOnly,
    FlightTesting,
    Operational,
}

pub type HandlerFn = fn(&str, Channel, &mut heapless::String<256>, &TelecommandContext) -> u8;

#[derive(Clone, Copy)]
pub struct TelecommandDef {
    pub name: &'static str,
    pub arg_count: u8,
    pub readiness: Readiness,
    pub handler: HandlerFn,
}

/// Shared services a handler may touch. Handlers run synchronously on the
/// executor task; anything needing `.await` is kicked off as a detached
/// `tokio::spawn` rather than blocking the executor (§9 design note).
pub struct TelecommandContext {
    pub time: &'static TimeService,
    pub agenda: Arc<agenda::AgendaT>,
    pub rf_switch: Arc<RfSwitchState>,
    pub bulk: Arc<BulkDownlinkTask>,
    pub downlink: Downlink,
    pub hw: Arc<Hardware>,
    pub uplink_received: Arc<AtomicBool>,
    pub device_prefix: &'static str,
}
