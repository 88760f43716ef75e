//! Golden checksum fixtures.
//!
//! A golden file pins the checksums a replay must produce at regular
//! frames, so a change to the simulation that alters outcomes shows up as
//! a failed comparison instead of a silently different game.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::checksum::{frame_checksum, DesyncComponent, DesyncInfo};
use crate::game::ruleset::GameSetup;
use crate::replay::Replay;
use crate::session::driver::{Session, SessionConfig, SessionError};

/// Checksums at one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenFrame {
    /// Frame number
    pub frame: u32,
    /// Full state checksum
    pub state_checksum: u32,
    /// Per-frame checksum
    pub frame_checksum: u32,
}

/// Golden checksums for one replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenChecksums {
    /// Hex SHA-256 of the serialized replay
    pub replay_digest: String,
    /// Capture interval in frames
    pub interval: u32,
    /// Captured frames, ascending
    pub frames: Vec<GoldenFrame>,
}

impl GoldenChecksums {
    /// Write as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!("Saved {} golden frames to {}", self.frames.len(), path.display());
        Ok(())
    }

    /// Read a file written by [`GoldenChecksums::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let golden: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        debug!("Loaded {} golden frames from {}", golden.frames.len(), path.display());
        Ok(golden)
    }
}

/// How a replay failed its golden checksums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoldenMismatch {
    /// The replay bytes are not the ones the fixture was made from.
    ReplayDigest {
        /// Digest in the fixture
        expected: String,
        /// Digest of the replay given
        actual: String,
    },
    /// A checksum differs.
    Checksum(DesyncInfo),
    /// The run produced a different number of captures.
    FrameCount {
        /// Captures in the fixture
        expected: usize,
        /// Captures produced
        actual: usize,
    },
}

fn capture(session: &Session<'_>) -> GoldenFrame {
    let state = session.state();
    GoldenFrame {
        frame: state.frame(),
        state_checksum: state.checksum(),
        frame_checksum: frame_checksum(state),
    }
}

/// Play `replay` once, capturing checksums at frame 0, every `interval`
/// frames, and at the end.
pub fn generate_golden(
    replay: &Replay,
    setup: &GameSetup,
    interval: u32,
) -> Result<GoldenChecksums, SessionError> {
    let interval = interval.max(1);
    let config = SessionConfig { store_snapshots: false, ..SessionConfig::default() };
    let mut session = Session::playback(replay, setup.clone(), config)?;

    let mut frames = vec![capture(&session)];
    while !session.is_finished() {
        session.step()?;
        let frame = session.cursor().frame();
        if frame % interval == 0 || session.is_finished() {
            frames.push(capture(&session));
        }
    }

    let golden = GoldenChecksums { replay_digest: replay.digest(), interval, frames };
    info!(
        "Generated {} golden frames for replay {} (interval {})",
        golden.frames.len(),
        &golden.replay_digest[..16],
        interval
    );
    Ok(golden)
}

/// Re-run `replay` and report the first difference from `golden`.
pub fn verify_golden(
    golden: &GoldenChecksums,
    replay: &Replay,
    setup: &GameSetup,
) -> Result<Option<GoldenMismatch>, SessionError> {
    let actual_digest = replay.digest();
    if actual_digest != golden.replay_digest {
        warn!("Golden digest mismatch: expected {}, got {}", golden.replay_digest, actual_digest);
        return Ok(Some(GoldenMismatch::ReplayDigest {
            expected: golden.replay_digest.clone(),
            actual: actual_digest,
        }));
    }

    let fresh = generate_golden(replay, setup, golden.interval)?;
    for (expected, actual) in golden.frames.iter().zip(&fresh.frames) {
        let checks = [
            (DesyncComponent::Frame, expected.frame, actual.frame),
            (DesyncComponent::State, expected.state_checksum, actual.state_checksum),
            (DesyncComponent::FrameChecksum, expected.frame_checksum, actual.frame_checksum),
        ];
        if let Some(&(component, e, a)) = checks.iter().find(|(_, e, a)| e != a) {
            let info = DesyncInfo { frame: expected.frame, component, expected: e, actual: a };
            warn!("Golden checksum mismatch: {}", info);
            return Ok(Some(GoldenMismatch::Checksum(info)));
        }
    }
    if golden.frames.len() != fresh.frames.len() {
        return Ok(Some(GoldenMismatch::FrameCount {
            expected: golden.frames.len(),
            actual: fresh.frames.len(),
        }));
    }

    info!("Golden checksums verified ({} frames)", golden.frames.len());
    Ok(None)
}
