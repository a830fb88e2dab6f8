use criterion::{criterion_group, criterion_main, Criterion};
use obc_wire::frame::{parse_frame, Channel, TelecommandLookup};

struct FixedLookup;
impl TelecommandLookup for FixedLookup {
    fn resolve(&self, name: &str) -> Option<(u8, u8)> {
        match name {
            "hello_world" => Some((0, 0)),
            "echo_back_args" => Some((1, 1)),
            _ => None,
        }
    }
}

fn bench_frame_parsing(c: &mut Criterion) {
    c.bench_function("parse_frame_tagged", |b| {
        let raw = "CTS1+echo_back_args(hello)@tssent=1000@tsexec=5000!";
        b.iter(|| {
            let parsed = parse_frame(raw, "CTS1+", Channel::Radio1, &FixedLookup).unwrap();
            std::hint::black_box(parsed);
        });
    });

    c.bench_function("parse_frame_untagged", |b| {
        let raw = "CTS1+hello_world()!";
        b.iter(|| {
            let parsed = parse_frame(raw, "CTS1+", Channel::DebugUart, &FixedLookup).unwrap();
            std::hint::black_box(parsed);
        });
    });
}

// Simplified stand-in for Agenda::pick_next's linear scan (the real type
// lives in a binary crate and isn't importable from a bench target).
#[derive(Clone)]
struct Slot {
    ts_exec_ms: u64,
}

fn pick_next(slots: &[Option<Slot>], now_ms: u64) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (idx, slot) in slots.iter().enumerate() {
        let Some(slot) = slot else { continue };
        if slot.ts_exec_ms == 0 {
            return Some(idx);
        }
        if slot.ts_exec_ms > now_ms {
            continue;
        }
        match best {
            Some((_, best_ts)) if slot.ts_exec_ms >= best_ts => {}
            _ => best = Some((idx, slot.ts_exec_ms)),
        }
    }
    best.map(|(idx, _)| idx)
}

fn bench_agenda_pick_next(c: &mut Criterion) {
    c.bench_function("pick_next_1000_slots_half_full", |b| {
        let slots: Vec<Option<Slot>> = (0..1000)
            .map(|i| {
                if i % 2 == 0 {
                    Some(Slot { ts_exec_ms: 1000 + i as u64 })
                } else {
                    None
                }
            })
            .collect();
        b.iter(|| {
            let idx = pick_next(&slots, 100_000);
            std::hint::black_box(idx);
        });
    });
}

criterion_group!(benches, bench_frame_parsing, bench_agenda_pick_next);
criterion_main!(benches);
