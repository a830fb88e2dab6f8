//! Telecommand executor (§4.6): one pick-next/execute cycle per `tick`.

use super::{TelecommandContext, TelecommandDef};
use crate::logging::{self, Severity, Subsystem};
use obc_wire::packet::PacketType;

/// Runs one pick-next/execute cycle. Returns `true` if an entry was executed.
pub async fn tick(table: &'static [TelecommandDef], ctx: &TelecommandContext) -> bool {
    let now = ctx.time.unix_epoch_ms();
    let Some(idx) = ctx.agenda.pick_next(now) else { return false };
    // Invalidated before the handler runs: undefined handler behavior cannot
    // cause double-execution.
    let Some(entry) = ctx.agenda.take_slot(idx) else { return false };

    if entry.channel == obc_wire::frame::Channel::Radio1 {
        ctx.uplink_received.store(true, std::sync::atomic::Ordering::SeqCst);
        ctx.rf_switch.note_uplink(ctx.time.uptime_ms());
    }

    let def = &table[entry.def_index as usize];
    let start_uptime = ctx.time.uptime_ms();
    let mut resp: heapless::String<256> = heapless::String::new();
    let code = (def.handler)(entry.args_str.as_str(), entry.channel, &mut resp, ctx);
    let end_uptime = ctx.time.uptime_ms();
    let duration_ms = end_uptime.saturating_sub(start_uptime).min(u16::MAX as u64) as u16;

    let payload = obc_wire::packet::build_tcmd_response_payload(
        entry.ts_sent_ms,
        code,
        duration_ms,
        resp.as_bytes(),
    );
    ctx.downlink.send_packet(PacketType::TcmdResponse, &payload);

    if !entry.response_log_file.is_empty() {
        let fs = ctx.hw.fs.clone();
        let path = std::path::PathBuf::from(entry.response_log_file.as_str());
        let mut line = resp.as_bytes().to_vec();
        line.push(b'\n');
        tokio::spawn(async move {
            if let Err(e) = fs.append_file(&path, &line).await {
                logging::global().log(
                    Subsystem::FileSystem,
                    Severity::Error,
                    logging::all_sinks_except(0),
                    format_args!("telecommand: response_log_file write failed: {e}"),
                );
            }
        });
    }

    logging::global().log(
        Subsystem::Telecommand,
        Severity::Normal,
        logging::SINK_ALL,
        format_args!("executed {} (slot {idx}): code={code} duration_ms={duration_ms}", def.name),
    );

    true
}

/// Drives `tick` forever with a short yield when nothing is due, per §5
/// ("wakes to run one agenda entry").
pub async fn run(table: &'static [TelecommandDef], ctx: TelecommandContext) {
    loop {
        if !tick(table, &ctx).await {
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }
    }
}
