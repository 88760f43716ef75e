//! Replay binary format: round trips, known encodings, malformed input.

use proptest::prelude::*;

use hexpop::core::fixed::{FIXED_HALF_PI, FIXED_TWO_PI};
use hexpop::game::state::Outcome;
use hexpop::game::{InputEvent, InputKind};
use hexpop::replay::{
    decode_varint, encode_varint, varint_len, Checkpoint, Replay, ReplayError, HEADER_LEN,
};

fn arb_kind() -> impl Strategy<Value = InputKind> {
    prop_oneof![
        Just(InputKind::RotateLeft),
        Just(InputKind::RotateRight),
        any::<i32>().prop_map(|angle| InputKind::Fire { angle }),
        Just(InputKind::Switch),
        Just(InputKind::Pause),
        Just(InputKind::Unpause),
    ]
}

fn arb_outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Incomplete),
        Just(Outcome::Won),
        Just(Outcome::Lost),
        Just(Outcome::Abandoned),
    ]
}

prop_compose! {
    fn arb_replay()(
        seed in any::<u64>(),
        level in "[a-z0-9-]{1,40}",
        ruleset in "[a-z0-9-]{1,40}",
        compact in any::<bool>(),
        inputs in prop::collection::vec((0u32..2000, arb_kind()), 0..200),
        checkpoint_every in 1usize..50,
        score in any::<u32>(),
        outcome in arb_outcome(),
    ) -> Replay {
        let mut replay = Replay::new(seed, level, ruleset, compact).unwrap();
        let mut frame = 0u32;
        for (i, (delta, kind)) in inputs.into_iter().enumerate() {
            frame += delta;
            if i % checkpoint_every == 0 {
                replay
                    .push_checkpoint(Checkpoint {
                        frame,
                        event_index: i as u32,
                        state_checksum: seed as u32 ^ frame,
                        board_checksum: i as u32,
                        rng_state: [1, 2, 3, frame],
                        score: i as u32 * 10,
                        shots_fired: i as u32,
                    })
                    .unwrap();
            }
            replay.push_event(InputEvent::new(frame, kind)).unwrap();
        }
        replay.finalize(frame + 1, score, outcome);
        replay
    }
}

proptest! {
    #[test]
    fn test_round_trip(replay in arb_replay()) {
        let bytes = replay.serialize();
        let decoded = Replay::deserialize(&bytes).unwrap();
        prop_assert_eq!(&decoded, &replay);
        prop_assert_eq!(decoded.serialize(), bytes);
    }

    #[test]
    fn test_every_truncation_fails(replay in arb_replay(), cut in any::<prop::sample::Index>()) {
        let bytes = replay.serialize();
        let len = cut.index(bytes.len());
        prop_assert!(Replay::deserialize(&bytes[..len]).is_err());
    }
}

#[test]
fn test_varint_300() {
    let mut out = Vec::new();
    assert_eq!(encode_varint(300, &mut out), 2);
    assert_eq!(out, vec![0xAC, 0x02]);
    assert_eq!(decode_varint(&out).unwrap(), (300, 2));
    assert_eq!(varint_len(300), 2);
}

#[test]
fn test_fire_angle_round_trip() {
    let mut replay = Replay::new(1, "level", "rules", true).unwrap();
    replay.push_event(InputEvent::fire(50, FIXED_HALF_PI)).unwrap();
    let decoded = Replay::deserialize(&replay.serialize()).unwrap();

    let event = decoded.events()[0];
    assert_eq!(event.frame, 50);
    let InputKind::Fire { angle } = event.kind else {
        panic!("expected a fire event, got {:?}", event.kind);
    };
    // One quantization step
    let step = FIXED_TWO_PI / 65536 + 1;
    assert!((angle - FIXED_HALF_PI).abs() <= step);
}

#[test]
fn test_truncated_header() {
    let bytes = Replay::new(1, "level", "rules", true).unwrap().serialize();
    assert_eq!(bytes.len(), HEADER_LEN);
    assert!(matches!(
        Replay::deserialize(&bytes[..HEADER_LEN - 1]),
        Err(ReplayError::Truncated { .. })
    ));
}

#[test]
fn test_file_round_trip() {
    let mut replay = Replay::new(9, "file", "rules", false).unwrap();
    replay.push_event(InputEvent::new(3, InputKind::Switch)).unwrap();
    replay.push_event(InputEvent::fire(400, 123_456)).unwrap();
    replay.finalize(500, 70, Outcome::Won);

    let path = std::env::temp_dir().join(format!("hexpop-format-test-{}.hxr", std::process::id()));
    replay.save(&path).unwrap();
    let loaded = Replay::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, replay);
    assert_eq!(loaded.digest(), replay.digest());
}

#[test]
fn test_missing_file() {
    let path = std::env::temp_dir().join("hexpop-does-not-exist.hxr");
    assert!(matches!(Replay::load(path), Err(ReplayError::Io(_))));
}
