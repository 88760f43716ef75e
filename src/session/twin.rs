//! Twin simulation: the same replay played by two independent sessions.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::checksum::{compare_fingerprints, DesyncInfo, Fingerprint};
use crate::game::ruleset::GameSetup;
use crate::replay::Replay;
use crate::session::driver::{Session, SessionConfig, SessionError};

/// Result of a twin run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwinReport {
    /// Ticks run
    pub ticks: u32,
    /// Final state checksum of each twin
    pub checksums: [u32; 2],
    /// Final score of each twin
    pub scores: [u32; 2],
    /// First tick on which the fingerprints differed
    pub divergence: Option<DesyncInfo>,
}

impl TwinReport {
    /// True when the twins never diverged.
    pub fn is_deterministic(&self) -> bool {
        self.divergence.is_none() && self.checksums[0] == self.checksums[1]
    }
}

/// Play `replay` in two sessions in lock step, comparing fingerprints
/// after every tick.
pub fn run_twin_simulation(replay: &Replay, setup: &GameSetup) -> Result<TwinReport, SessionError> {
    let config = SessionConfig { store_snapshots: false, ..SessionConfig::default() };
    let mut first = Session::playback(replay, setup.clone(), config.clone())?;
    let mut second = Session::playback(replay, setup.clone(), config)?;

    let mut ticks = 0;
    let mut divergence = None;
    while !first.is_finished() {
        first.step()?;
        second.step()?;
        ticks += 1;

        if divergence.is_none() {
            divergence = compare_fingerprints(
                &Fingerprint::capture(first.state()),
                &Fingerprint::capture(second.state()),
            );
            if let Some(info) = divergence {
                warn!("Twin simulation diverged: {}", info);
            }
        }
    }

    let report = TwinReport {
        ticks,
        checksums: [first.state().checksum(), second.state().checksum()],
        scores: [first.state().score(), second.state().score()],
        divergence,
    };
    info!(
        "Twin simulation: {} ticks, checksums {:08x}/{:08x}, deterministic: {}",
        report.ticks,
        report.checksums[0],
        report.checksums[1],
        report.is_deterministic()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_HALF_PI;
    use crate::game::ruleset::Ruleset;
    use crate::game::state::GamePhase;

    #[test]
    fn test_twins_agree() {
        let setup = GameSetup::new("twin", Ruleset { ready_frames: 1, ..Ruleset::default() });
        let mut recorder = Session::record(99, setup.clone(), SessionConfig::default()).unwrap();
        for _ in 0..150 {
            if recorder.state().phase() == GamePhase::Playing && !recorder.state().shot().is_active() {
                recorder.fire(FIXED_HALF_PI - 8192).unwrap();
            }
            recorder.step().unwrap();
        }
        recorder.finish().unwrap();
        let replay = recorder.into_replay();

        let report = run_twin_simulation(&replay, &setup).unwrap();
        assert!(report.is_deterministic());
        assert_eq!(report.ticks, replay.duration());
        assert_eq!(report.scores[0], replay.final_score());
    }

    #[test]
    fn test_empty_replay() {
        let setup = GameSetup::new("twin", Ruleset::default());
        let replay = Replay::for_setup(5, &setup, true).unwrap();
        let report = run_twin_simulation(&replay, &setup).unwrap();
        assert_eq!(report.ticks, 0);
        assert!(report.is_deterministic());
    }
}
