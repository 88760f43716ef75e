//! Criterion benchmarks for tick throughput, checksums and the replay codec.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hexpop::checksum::{crc32, state_checksum};
use hexpop::core::fixed::{AIM_MAX, AIM_MIN, FIXED_HALF_PI};
use hexpop::game::{GamePhase, GameSetup, GameState, InputEvent, InputKind, Outcome, Ruleset};
use hexpop::session::{Session, SessionConfig};
use hexpop::Replay;

/// A game past its countdown with a shot in flight.
fn playing_state() -> GameState {
    let mut state = GameState::init(12345, Ruleset { ready_frames: 1, ..Ruleset::default() }).unwrap();
    while state.phase() != GamePhase::Playing {
        state.step().unwrap();
    }
    state.fire(FIXED_HALF_PI).unwrap();
    state
}

/// Build a replay with `n` events spread over the game.
fn make_replay(n: u32) -> Replay {
    let mut replay = Replay::new(7, "bench", "classic", true).unwrap();
    for i in 0..n {
        let kind = match i % 4 {
            0 => InputKind::RotateLeft,
            1 => InputKind::Fire { angle: AIM_MIN + (i as i32 * 977) % (AIM_MAX - AIM_MIN) },
            2 => InputKind::Switch,
            _ => InputKind::RotateRight,
        };
        replay.push_event(InputEvent::new(i * 7, kind)).unwrap();
    }
    replay.finalize(n * 7, 0, Outcome::Incomplete);
    replay
}

/// Benchmark: One tick with a shot in flight.
fn bench_tick(c: &mut Criterion) {
    let state = playing_state();

    c.bench_function("tick_shot_in_flight", |b| {
        b.iter(|| {
            let mut state = state.clone();
            black_box(state.step().unwrap());
        });
    });
}

/// Benchmark: Full state checksum.
fn bench_state_checksum(c: &mut Criterion) {
    let state = playing_state();

    c.bench_function("state_checksum", |b| {
        b.iter(|| black_box(state_checksum(black_box(&state))));
    });
}

/// Benchmark: CRC32 over 64 KiB.
fn bench_crc32(c: &mut Criterion) {
    let data: Vec<u8> = (0..65_536u32).map(|i| (i * 31) as u8).collect();

    c.bench_function("crc32_64k", |b| {
        b.iter(|| black_box(crc32(black_box(&data))));
    });
}

/// Benchmark: Encode and decode a replay with 10K events.
fn bench_replay_codec(c: &mut Criterion) {
    let replay = make_replay(10_000);
    let bytes = replay.serialize();

    c.bench_function("replay_serialize_10k", |b| {
        b.iter(|| black_box(replay.serialize()));
    });
    c.bench_function("replay_deserialize_10k", |b| {
        b.iter(|| black_box(Replay::deserialize(black_box(&bytes)).unwrap()));
    });
}

/// Benchmark: Record and play back 600 frames.
fn bench_playback(c: &mut Criterion) {
    let setup = GameSetup::new("bench", Ruleset { ready_frames: 1, ..Ruleset::default() });
    let mut recorder = Session::record(99, setup.clone(), SessionConfig::default()).unwrap();
    for i in 0..600 {
        let state = recorder.state();
        if state.phase() == GamePhase::Playing && !state.shot().is_active() {
            let _ = recorder.fire(FIXED_HALF_PI + (i % 9 - 4) * 3000);
        }
        recorder.step().unwrap();
    }
    recorder.finish().unwrap();
    let replay = recorder.into_replay();

    c.bench_function("playback_600_frames", |b| {
        b.iter(|| {
            let config = SessionConfig { store_snapshots: false, ..SessionConfig::default() };
            let mut session = Session::playback(&replay, setup.clone(), config).unwrap();
            while !session.is_finished() {
                session.step().unwrap();
            }
            black_box(session.state().checksum())
        });
    });
}

criterion_group!(
    benches,
    bench_tick,
    bench_state_checksum,
    bench_crc32,
    bench_replay_codec,
    bench_playback,
);
criterion_main!(benches);
