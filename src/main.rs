//! Hexpop Simulation
//!
//! Records a scripted game, writes the replay to disk, reads it back and
//! proves it reproduces with a twin run and golden checksums.

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hexpop::{
    core::fixed::{AIM_MAX, AIM_MIN, ROTATE_STEP},
    game::{GamePhase, GameSetup, Ruleset},
    replay::Replay,
    session::{generate_golden, run_twin_simulation, verify_golden, Session, SessionConfig},
    TICK_RATE, VERSION,
};

/// Frames the demo records (two minutes at 60Hz).
const DEMO_FRAMES: u32 = 7200;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Hexpop Simulation v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let seed = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<u64>())
        .transpose()
        .context("seed must be an unsigned integer")?
        .unwrap_or(12345);

    demo(seed)
}

/// Record, save, load and verify one game.
fn demo(seed: u64) -> anyhow::Result<()> {
    info!("=== Recording Demo Game ===");
    let setup = GameSetup::new("demo", Ruleset::default());
    let mut session = Session::record(seed, setup.clone(), SessionConfig::default())?;

    // Sweep the cannon back and forth, firing every time it is free
    let mut sweep_left = true;
    for _ in 0..DEMO_FRAMES {
        let state = session.state();
        if state.is_over() {
            break;
        }
        if state.phase() == GamePhase::Playing && !state.shot().is_active() {
            let angle = state.cannon_angle();
            if angle + ROTATE_STEP * 4 > AIM_MAX {
                sweep_left = false;
            } else if angle - ROTATE_STEP * 4 < AIM_MIN {
                sweep_left = true;
            }
            for _ in 0..4 {
                if sweep_left {
                    session.rotate_left()?;
                } else {
                    session.rotate_right()?;
                }
            }
            let angle = session.state().cannon_angle();
            session.fire(angle)?;
        }
        session.update()?;
    }
    session.finish()?;

    let state = session.state();
    info!(
        "Recorded {} frames: {:?}, score {}, {} shots",
        state.frame(),
        state.outcome(),
        state.score(),
        state.shots_fired()
    );
    let replay = session.into_replay();

    info!("=== Round Trip ===");
    let path = std::env::temp_dir().join(format!("hexpop-demo-{}.hxr", seed));
    replay.save(&path)?;
    let loaded = Replay::load(&path)?;
    if loaded.serialize() != replay.serialize() {
        bail!("replay changed after a save/load round trip");
    }
    info!("Replay digest: {}", loaded.digest());

    info!("=== Verifying Determinism ===");
    let report = run_twin_simulation(&loaded, &setup)?;
    if !report.is_deterministic() {
        bail!("twin simulation diverged: {:?}", report.divergence);
    }
    info!("Final state checksum: {}", hex::encode(report.checksums[0].to_be_bytes()));

    let golden = generate_golden(&loaded, &setup, 600)?;
    match verify_golden(&golden, &loaded, &setup)? {
        None => info!("DETERMINISM VERIFIED: {} golden frames match", golden.frames.len()),
        Some(mismatch) => bail!("golden checksums differ: {:?}", mismatch),
    }
    Ok(())
}
