//! Sessions end to end: record, persist, play back, verify.

use hexpop::checksum::DesyncComponent;
use hexpop::core::fixed::FIXED_HALF_PI;
use hexpop::game::{GamePhase, GameSetup, Ruleset};
use hexpop::replay::{CHECKPOINT_LEN, HEADER_LEN};
use hexpop::session::{
    generate_golden, run_twin_simulation, verify_golden, GoldenChecksums, Session, SessionConfig,
    SessionError, SessionMode,
};
use hexpop::Replay;

fn setup() -> GameSetup {
    GameSetup::new("sessions", Ruleset { ready_frames: 3, ..Ruleset::default() })
}

fn config() -> SessionConfig {
    SessionConfig { checkpoint_interval: 60, ..SessionConfig::default() }
}

fn record(frames: u32) -> Session<'static> {
    let mut session = Session::record(2024, setup(), config()).unwrap();
    let mut shot = 0;
    for _ in 0..frames {
        let state = session.state();
        if state.phase() == GamePhase::Playing && !state.shot().is_active() {
            shot += 1;
            if shot % 4 == 0 {
                session.swap().unwrap();
            }
            session.fire(FIXED_HALF_PI + (shot % 5 - 2) * 10_000).unwrap();
        }
        session.update().unwrap();
    }
    session
}

#[test]
fn test_two_playbacks_agree() {
    let mut recorder = record(400);
    recorder.finish().unwrap();
    let replay = recorder.into_replay();

    let mut a = Session::playback(&replay, setup(), config()).unwrap();
    let mut b = Session::playback(&replay, setup(), config()).unwrap();
    while !a.is_finished() {
        a.step().unwrap();
        b.step().unwrap();
        assert_eq!(a.state().checksum(), b.state().checksum());
    }
    assert!(b.is_finished());
    assert_eq!(a.desync_count(), 0);
    assert_eq!(a.state().score(), replay.final_score());

    let report = run_twin_simulation(&replay, &setup()).unwrap();
    assert!(report.is_deterministic());
}

#[test]
fn test_saved_replay_verifies() {
    let mut recorder = record(300);
    recorder.finish().unwrap();
    let reference = recorder.checksums().clone();
    let expected = recorder.state().checksum();
    let replay = recorder.into_replay();

    let path = std::env::temp_dir().join(format!("hexpop-session-{}.hxr", std::process::id()));
    replay.save(&path).unwrap();
    let loaded = Replay::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let mut verifier = Session::verification(loaded, setup(), config(), Some(reference)).unwrap();
    assert_eq!(verifier.mode(), SessionMode::Verification);
    while !verifier.is_finished() {
        verifier.update().unwrap();
    }
    assert_eq!(verifier.desync_count(), 0);
    assert_eq!(verifier.state().checksum(), expected);
}

#[test]
fn test_corrupted_event_desyncs_without_aborting() {
    let mut recorder = record(300);
    recorder.finish().unwrap();
    let replay = recorder.into_replay();
    assert!(replay.event_count() > 0);

    // First event is a compact fire: header byte, one-byte frame delta,
    // then the u16 angle. Flip a bit in the angle's high byte.
    let mut bytes = replay.serialize();
    let first_event = HEADER_LEN + replay.checkpoint_count() * CHECKPOINT_LEN;
    bytes[first_event + 3] ^= 0x08;
    let tampered = Replay::deserialize(&bytes).unwrap();

    let mut verifier = Session::verification(&tampered, setup(), config(), None).unwrap();
    while !verifier.is_finished() {
        verifier.step().unwrap();
    }
    let desync = verifier.first_desync().expect("tampered angle must be detected");
    assert!(desync.frame > 0);
    assert_ne!(desync.component, DesyncComponent::FrameChecksum);
}

#[test]
fn test_golden_fixture_round_trip() {
    let mut recorder = record(240);
    recorder.finish().unwrap();
    let replay = recorder.into_replay();

    let golden = generate_golden(&replay, &setup(), 60).unwrap();
    let path = std::env::temp_dir().join(format!("hexpop-golden-it-{}.json", std::process::id()));
    golden.save(&path).unwrap();
    let loaded = GoldenChecksums::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded, golden);
    assert_eq!(verify_golden(&loaded, &replay, &setup()).unwrap(), None);
}

#[test]
fn test_live_session_records_nothing() {
    let mut session = Session::live(5, setup(), config()).unwrap();
    for _ in 0..10 {
        session.update().unwrap();
    }
    session.rotate_right().unwrap();
    assert_eq!(session.replay().event_count(), 0);
    assert_eq!(session.checksums().len(), 10);
    assert!(matches!(session.checkpoint(), Err(SessionError::WrongMode { .. })));
}

#[test]
fn test_seek_then_resume() {
    let mut recorder = record(300);
    recorder.finish().unwrap();
    let reference = recorder.checksums().clone();
    let replay = recorder.into_replay();

    let mut session = Session::verification(&replay, setup(), config(), Some(reference)).unwrap();
    session.seek(150).unwrap();
    assert_eq!(session.state().frame(), 150);
    while !session.is_finished() {
        session.step().unwrap();
    }
    assert_eq!(session.desync_count(), 0);
    assert_eq!(session.state().score(), replay.final_score());
}
