//! Agenda (§4.6, §3): a fixed-capacity scheduling queue with a parallel
//! validity flag per slot, and a circular replay-protection ring.

use crate::errors::OcsError;
use obc_wire::frame::ParsedFrame;
use parking_lot::Mutex;

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_REPLAY_CAPACITY: usize = 500;

pub type AgendaT = Agenda<DEFAULT_CAPACITY, DEFAULT_REPLAY_CAPACITY>;

pub struct Agenda<const N: usize, const R: usize> {
    slots: Mutex<Vec<Option<ParsedFrame>>>,
    replay_ring: Mutex<heapless::Deque<u64, R>>,
    replay_protection_enabled: bool,
}

impl<const N: usize, const R: usize> Agenda<N, R> {
    pub fn new(replay_protection_enabled: bool) -> Self {
        let mut slots = Vec::with_capacity(N);
        slots.resize_with(N, || None);
        Self {
            slots: Mutex::new(slots),
            replay_ring: Mutex::new(heapless::Deque::new()),
            replay_protection_enabled,
        }
    }

    /// Finds the first invalid slot and occupies it, after the replay check.
    pub fn add(&self, entry: ParsedFrame) -> Result<(), OcsError> {
        if self.replay_protection_enabled && entry.ts_sent_ms != 0 {
            let ring = self.replay_ring.lock();
            if ring.iter().any(|&ts| ts == entry.ts_sent_ms) {
                return Err(OcsError::ReplayRejected);
            }
        }

        let mut slots = self.slots.lock();
        let free = slots.iter().position(|s| s.is_none()).ok_or(OcsError::AgendaFull)?;
        let ts_sent = entry.ts_sent_ms;
        slots[free] = Some(entry);
        drop(slots);

        if ts_sent != 0 {
            let mut ring = self.replay_ring.lock();
            if ring.is_full() {
                ring.pop_front();
            }
            let _ = ring.push_back(ts_sent);
        }
        Ok(())
    }

    /// Returns the slot index of the smallest-`ts_exec_ms` eligible entry, or
    /// `None` if nothing is due. `ts_exec_ms == 0` is eligible immediately
    /// and may be returned on first sight.
    pub fn pick_next(&self, now_epoch_ms: u64) -> Option<usize> {
        let slots = self.slots.lock();
        let mut best: Option<(usize, u64)> = None;
        for (idx, slot) in slots.iter().enumerate() {
            let Some(entry) = slot else { continue };
            if entry.ts_exec_ms == 0 {
                return Some(idx);
            }
            if entry.ts_exec_ms > now_epoch_ms {
                continue;
            }
            match best {
                Some((_, best_ts)) if entry.ts_exec_ms >= best_ts => {}
                _ => best = Some((idx, entry.ts_exec_ms)),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Invalidates the slot and returns its entry, before the caller invokes
    /// the handler, so a handler fault cannot cause double-execution.
    pub fn take_slot(&self, index: usize) -> Option<ParsedFrame> {
        let mut slots = self.slots.lock();
        slots.get_mut(index).and_then(|s| s.take())
    }

    pub fn delete_by_ts_sent(&self, ts_sent_ms: u64) -> usize {
        let mut slots = self.slots.lock();
        let mut count = 0;
        for slot in slots.iter_mut() {
            if slot.as_ref().is_some_and(|e| e.ts_sent_ms == ts_sent_ms) {
                *slot = None;
                count += 1;
            }
        }
        count
    }

    pub fn delete_by_def_index(&self, def_index: u8) -> usize {
        let mut slots = self.slots.lock();
        let mut count = 0;
        for slot in slots.iter_mut() {
            if slot.as_ref().is_some_and(|e| e.def_index == def_index) {
                *slot = None;
                count += 1;
            }
        }
        count
    }

    pub fn delete_all(&self) -> usize {
        let mut slots = self.slots.lock();
        let mut count = 0;
        for slot in slots.iter_mut() {
            if slot.is_some() {
                *slot = None;
                count += 1;
            }
        }
        count
    }

    pub fn used_count(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }

    /// One JSON-ish summary per valid slot: `{slot, channel, ts_sent, ts_exec}`.
    pub fn fetch_summaries(&self) -> Vec<serde_json::Value> {
        let slots = self.slots.lock();
        slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                slot.as_ref().map(|e| {
                    serde_json::json!({
                        "slot": idx,
                        "channel": format!("{:?}", e.channel),
                        "ts_sent": e.ts_sent_ms,
                        "ts_exec": e.ts_exec_ms,
                    })
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obc_wire::frame::Channel;

    type SmallAgenda = Agenda<4, 4>;

    fn entry(ts_sent: u64, ts_exec: u64) -> ParsedFrame {
        ParsedFrame {
            def_index: 0,
            args_str: heapless::String::new(),
            channel: Channel::DebugUart,
            ts_sent_ms: ts_sent,
            ts_exec_ms: ts_exec,
            response_log_file: heapless::String::new(),
        }
    }

    #[test]
    fn pick_next_orders_by_ts_exec_ascending() {
        let agenda = SmallAgenda::new(false);
        agenda.add(entry(1, 5000)).unwrap();
        agenda.add(entry(2, 1000)).unwrap();
        assert_eq!(agenda.pick_next(10_000), Some(1));
    }

    #[test]
    fn not_due_entries_are_never_picked() {
        let agenda = SmallAgenda::new(false);
        agenda.add(entry(1, 5000)).unwrap();
        assert_eq!(agenda.pick_next(4_999), None);
        assert_eq!(agenda.pick_next(5000), Some(0));
    }

    #[test]
    fn replay_reject_on_duplicate_ts_sent() {
        let agenda = SmallAgenda::new(true);
        assert!(agenda.add(entry(42, 0)).is_ok());
        assert_eq!(agenda.used_count(), 1);
        assert!(matches!(agenda.add(entry(42, 0)), Err(OcsError::ReplayRejected)));
        assert_eq!(agenda.used_count(), 1);
    }

    #[test]
    fn take_slot_invalidates_before_returning() {
        let agenda = SmallAgenda::new(false);
        agenda.add(entry(1, 0)).unwrap();
        let idx = agenda.pick_next(0).unwrap();
        let taken = agenda.take_slot(idx).unwrap();
        assert_eq!(taken.ts_sent_ms, 1);
        assert_eq!(agenda.used_count(), 0);
        assert!(agenda.take_slot(idx).is_none());
    }

    #[test]
    fn agenda_full_when_capacity_exhausted() {
        let agenda = SmallAgenda::new(false);
        for i in 0..4 {
            agenda.add(entry(i + 1, 0)).unwrap();
        }
        assert!(matches!(agenda.add(entry(99, 0)), Err(OcsError::AgendaFull)));
    }
}
