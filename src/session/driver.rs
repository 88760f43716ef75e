//! Game Session
//!
//! Owns one [`GameState`] and drives it in one of four modes. Live and
//! Recording sessions take inputs from the caller; Playback and
//! Verification sessions pull them from a replay.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::checksum::{compare_checkpoint, frame_checksum, ChecksumRing, DesyncComponent, DesyncInfo};
use crate::core::fixed::Fixed;
use crate::game::input::{InputEvent, InputKind};
use crate::game::ruleset::GameSetup;
use crate::game::state::{GameState, Outcome};
use crate::game::tick::TickResult;
use crate::game::GameError;
use crate::replay::{Checkpoint, Playback, Replay, ReplayError, SeekPoint, MAX_REPLAY_EVENTS};

/// What drives the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    /// Caller inputs, nothing persisted.
    Live,
    /// Caller inputs, appended to a replay.
    Recording,
    /// Inputs read from a replay.
    Playback,
    /// Inputs read from a replay; checkpoints and checksums compared.
    Verification,
}

/// Configuration for a game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Automatic checkpoint every N frames while recording (0 = off).
    pub checkpoint_interval: u32,
    /// Capacity of the per-frame checksum history.
    pub checksum_history: usize,
    /// Record fire angles as compact u16.
    pub compact_angles: bool,
    /// Keep a bincode snapshot of the state at every checkpoint.
    pub store_snapshots: bool,
    /// Tick cap for one `update` call at high playback speed.
    pub max_ticks_per_update: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 600, // 10 seconds @ 60Hz
            checksum_history: 1024,
            compact_angles: true,
            store_snapshots: true,
            max_ticks_per_update: 8,
        }
    }
}

/// A game session.
pub struct Session<'r> {
    mode: SessionMode,
    config: SessionConfig,
    setup: GameSetup,
    seed: u64,
    state: GameState,
    replay: Cow<'r, Replay>,
    playback: Playback,
    /// Frame checksum after every tick
    checksums: ChecksumRing,
    /// Checksums of a trusted run, compared in Verification
    reference: Option<ChecksumRing>,
    /// Checkpoint index to bincode state
    snapshots: BTreeMap<usize, Vec<u8>>,
    finished: bool,
    first_desync: Option<DesyncInfo>,
    last_desync: Option<DesyncInfo>,
    desync_count: u32,
}

impl Session<'static> {
    /// Play without recording.
    pub fn live(seed: u64, setup: GameSetup, config: SessionConfig) -> Result<Self, SessionError> {
        let replay = Replay::for_setup(seed, &setup, config.compact_angles)?;
        Self::build(SessionMode::Live, seed, setup, config, Cow::Owned(replay), None)
    }

    /// Play and record every accepted input.
    ///
    /// The initial checkpoint is taken at frame 0.
    pub fn record(seed: u64, setup: GameSetup, config: SessionConfig) -> Result<Self, SessionError> {
        let replay = Replay::for_setup(seed, &setup, config.compact_angles)?;
        let mut session =
            Self::build(SessionMode::Recording, seed, setup, config, Cow::Owned(replay), None)?;
        session.checkpoint()?;
        Ok(session)
    }
}

impl<'r> Session<'r> {
    /// Re-simulate a replay.
    pub fn playback(
        replay: impl Into<Cow<'r, Replay>>,
        setup: GameSetup,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let replay = replay.into();
        check_setup(&replay, &setup)?;
        Self::build(SessionMode::Playback, replay.seed(), setup, config, replay, None)
    }

    /// Re-simulate a replay, comparing every checkpoint and, when given,
    /// every frame checksum of `reference`.
    pub fn verification(
        replay: impl Into<Cow<'r, Replay>>,
        setup: GameSetup,
        config: SessionConfig,
        reference: Option<ChecksumRing>,
    ) -> Result<Self, SessionError> {
        let replay = replay.into();
        check_setup(&replay, &setup)?;
        Self::build(SessionMode::Verification, replay.seed(), setup, config, replay, reference)
    }

    fn build(
        mode: SessionMode,
        seed: u64,
        setup: GameSetup,
        config: SessionConfig,
        replay: Cow<'r, Replay>,
        reference: Option<ChecksumRing>,
    ) -> Result<Self, SessionError> {
        let state = initial_state(seed, &setup)?;
        debug!("Session started in {:?} mode (seed {}, level {})", mode, seed, setup.level_id);
        Ok(Self {
            mode,
            checksums: ChecksumRing::new(config.checksum_history),
            config,
            setup,
            seed,
            state,
            replay,
            playback: Playback::new(),
            reference,
            snapshots: BTreeMap::new(),
            finished: false,
            first_desync: None,
            last_desync: None,
            desync_count: 0,
        })
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Session mode.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Game setup.
    pub fn setup(&self) -> &GameSetup {
        &self.setup
    }

    /// RNG seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Read-only game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// The replay being recorded or played.
    pub fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Playback cursor.
    pub fn cursor(&self) -> &Playback {
        &self.playback
    }

    /// Frame checksum history.
    pub fn checksums(&self) -> &ChecksumRing {
        &self.checksums
    }

    /// Number of stored state snapshots.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// First divergence detected.
    pub fn first_desync(&self) -> Option<DesyncInfo> {
        self.first_desync
    }

    /// Most recent divergence detected.
    pub fn last_desync(&self) -> Option<DesyncInfo> {
        self.last_desync
    }

    /// Divergences detected so far.
    pub fn desync_count(&self) -> u32 {
        self.desync_count
    }

    /// A recording is finished once `finish` ran; a playback once the
    /// replay is exhausted.
    pub fn is_finished(&self) -> bool {
        match self.mode {
            SessionMode::Live | SessionMode::Recording => self.finished,
            SessionMode::Playback | SessionMode::Verification => {
                self.playback.is_exhausted(&self.replay)
            }
        }
    }

    // =========================================================================
    // INPUT (Live / Recording)
    // =========================================================================

    /// Rotate the cannon counter-clockwise.
    pub fn rotate_left(&mut self) -> Result<(), SessionError> {
        self.input(InputKind::RotateLeft)
    }

    /// Rotate the cannon clockwise.
    pub fn rotate_right(&mut self) -> Result<(), SessionError> {
        self.input(InputKind::RotateRight)
    }

    /// Fire at `angle`. Compact recordings snap the angle first so the
    /// game sees exactly what playback will.
    pub fn fire(&mut self, angle: Fixed) -> Result<(), SessionError> {
        self.input(InputKind::Fire { angle })
    }

    /// Swap the loaded and next bubble.
    pub fn swap(&mut self) -> Result<(), SessionError> {
        self.input(InputKind::Switch)
    }

    /// Pause the game.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.input(InputKind::Pause)
    }

    /// Resume the game.
    pub fn unpause(&mut self) -> Result<(), SessionError> {
        self.input(InputKind::Unpause)
    }

    fn input(&mut self, kind: InputKind) -> Result<(), SessionError> {
        self.require_mode(&[SessionMode::Live, SessionMode::Recording], "input")?;
        if self.finished {
            return Err(SessionError::Finished);
        }

        let recording = self.mode == SessionMode::Recording;
        let kind = if recording && self.replay.compact_angles() {
            kind.quantized()
        } else {
            kind
        };
        if recording && self.replay.event_count() >= MAX_REPLAY_EVENTS {
            return Err(ReplayError::CapacityExceeded { what: "events", limit: MAX_REPLAY_EVENTS }.into());
        }

        let event = InputEvent::new(self.state.frame(), kind);
        self.state.apply_input(&event)?;
        if recording {
            self.replay.to_mut().push_event(event)?;
        }
        Ok(())
    }

    // =========================================================================
    // SIMULATION
    // =========================================================================

    /// Advance the session.
    ///
    /// Live and Recording run one tick. Playback and Verification run as
    /// many ticks as the playback speed grants, capped by
    /// `max_ticks_per_update`, and stop once the replay is exhausted.
    /// Returns the number of ticks run.
    pub fn update(&mut self) -> Result<u32, SessionError> {
        match self.mode {
            SessionMode::Live | SessionMode::Recording => {
                self.step()?;
                Ok(1)
            }
            SessionMode::Playback | SessionMode::Verification => {
                let due = self.playback.ticks_due().min(self.config.max_ticks_per_update);
                let mut ran = 0;
                while ran < due && !self.playback.is_exhausted(&self.replay) {
                    self.step()?;
                    ran += 1;
                }
                Ok(ran)
            }
        }
    }

    /// Run exactly one tick, ignoring playback speed.
    pub fn step(&mut self) -> Result<TickResult, SessionError> {
        if self.finished {
            return Err(SessionError::Finished);
        }
        let was_over = self.state.is_over();
        let frame_before = self.state.frame();

        if matches!(self.mode, SessionMode::Playback | SessionMode::Verification) {
            self.inject_due()?;
        }

        let result = self.state.step()?;
        let frame = self.state.frame();

        if matches!(self.mode, SessionMode::Playback | SessionMode::Verification) {
            self.playback.advance_frame();
        }

        let checksum = frame_checksum(&self.state);
        self.checksums.record(frame, checksum);
        if self.mode == SessionMode::Verification {
            let expected = self.reference.as_ref().and_then(|reference| reference.lookup(frame));
            if let Some(expected) = expected {
                if expected != checksum {
                    self.report_desync(DesyncInfo {
                        frame,
                        component: DesyncComponent::FrameChecksum,
                        expected,
                        actual: checksum,
                    });
                }
            }
        }

        if result.game_over && !was_over {
            info!(
                "Game over at frame {}: {:?}, score {}",
                frame,
                result.outcome,
                self.state.score()
            );
        }

        let interval = self.config.checkpoint_interval;
        if self.mode == SessionMode::Recording
            && interval > 0
            && frame != frame_before
            && frame % interval == 0
        {
            self.checkpoint()?;
        }

        Ok(result)
    }

    /// Feed every input and checkpoint due at the current frame.
    fn inject_due(&mut self) -> Result<(), SessionError> {
        loop {
            while let Some((index, checkpoint)) = self.playback.due_checkpoint(&self.replay) {
                self.reach_checkpoint(index, &checkpoint)?;
            }
            let Some(event) = self.playback.next_event(&self.replay) else {
                return Ok(());
            };
            if let Err(e) = self.state.apply_input(&event) {
                warn!("Recorded input {:?} at frame {} rejected: {}", event.kind, event.frame, e);
            }
        }
    }

    fn reach_checkpoint(&mut self, index: usize, checkpoint: &Checkpoint) -> Result<(), SessionError> {
        let mismatch = compare_checkpoint(checkpoint, &self.state);
        match mismatch {
            Some(info) if self.mode == SessionMode::Verification => self.report_desync(info),
            Some(_) => {}
            None => {
                if self.config.store_snapshots && !self.snapshots.contains_key(&index) {
                    self.snapshots.insert(index, self.state.to_snapshot()?);
                }
            }
        }
        debug!("Checkpoint {} reached at frame {}", index, checkpoint.frame);
        Ok(())
    }

    fn report_desync(&mut self, info: DesyncInfo) {
        warn!("Desync detected: {}", info);
        if self.first_desync.is_none() {
            self.first_desync = Some(info);
        }
        self.last_desync = Some(info);
        self.desync_count += 1;
    }

    // =========================================================================
    // RECORDING
    // =========================================================================

    /// Record a checkpoint of the current state (Recording only).
    pub fn checkpoint(&mut self) -> Result<Checkpoint, SessionError> {
        self.require_mode(&[SessionMode::Recording], "checkpoint")?;
        if self.finished {
            return Err(SessionError::Finished);
        }

        let index = self.replay.checkpoint_count();
        let checkpoint = Checkpoint::capture(&self.state, self.replay.event_count() as u32);
        let snapshot = if self.config.store_snapshots {
            Some(self.state.to_snapshot()?)
        } else {
            None
        };
        self.replay.to_mut().push_checkpoint(checkpoint)?;
        if let Some(snapshot) = snapshot {
            self.snapshots.insert(index, snapshot);
        }

        debug!("Checkpoint {} recorded at frame {}", index, checkpoint.frame);
        Ok(checkpoint)
    }

    /// Finalize the recording with the game's outcome, or `Incomplete`
    /// if the game is still running.
    pub fn finish(&mut self) -> Result<(), SessionError> {
        let outcome = if self.state.is_over() {
            self.state.outcome()
        } else {
            Outcome::Incomplete
        };
        self.finish_with(outcome)
    }

    /// Finalize the recording as abandoned.
    pub fn abandon(&mut self) -> Result<(), SessionError> {
        self.finish_with(Outcome::Abandoned)
    }

    fn finish_with(&mut self, outcome: Outcome) -> Result<(), SessionError> {
        self.require_mode(&[SessionMode::Recording], "finish")?;
        if self.finished {
            return Err(SessionError::Finished);
        }

        let position = (self.state.frame(), self.replay.event_count() as u32);
        let last = self.replay.checkpoints().last().map(|c| (c.frame, c.event_index));
        if last != Some(position) {
            self.checkpoint()?;
        }

        let (frame, score) = (self.state.frame(), self.state.score());
        self.replay.to_mut().finalize(frame, score, outcome);
        self.finished = true;
        info!(
            "Recording finished: {} frames, {} events, score {}, {:?}",
            frame,
            self.replay.event_count(),
            score,
            outcome
        );
        Ok(())
    }

    /// Hand the replay over.
    pub fn into_replay(self) -> Replay {
        self.replay.into_owned()
    }

    // =========================================================================
    // PLAYBACK
    // =========================================================================

    /// Set playback speed in percent (0 pauses, 100 normal).
    pub fn set_speed(&mut self, percent: u32) {
        self.playback.set_speed(percent);
    }

    /// Jump to `target` (Playback/Verification).
    ///
    /// Restores the closest checkpoint at or before `target` from its
    /// snapshot, or re-simulates from the start when none is stored, then
    /// plays forward. Nothing changes unless every checkpoint on the way
    /// matches.
    pub fn seek(&mut self, target: u32) -> Result<SeekPoint, SessionError> {
        self.require_mode(&[SessionMode::Playback, SessionMode::Verification], "seek")?;

        let replay: &Replay = &self.replay;
        let mut playback = self.playback.clone();
        let mut point = playback.seek(replay, target);

        let restored = match point.checkpoint.and_then(|i| self.snapshots.get(&i).map(|s| (i, s))) {
            Some((index, snapshot)) => {
                let state = GameState::from_snapshot(snapshot)?;
                if let Some(info) = compare_checkpoint(&replay.checkpoints()[index], &state) {
                    return Err(SessionError::CheckpointMismatch(info));
                }
                Some(state)
            }
            None => None,
        };
        let mut state = match restored {
            Some(state) => state,
            None => {
                let speed = playback.speed();
                playback = Playback::new();
                playback.set_speed(speed);
                point = SeekPoint { checkpoint: None, event_index: 0, frame: 0 };
                initial_state(self.seed, &self.setup)?
            }
        };

        play_forward(&mut state, &mut playback, replay, target)?;

        self.state = state;
        self.playback = playback;
        self.checksums.clear();
        debug!("Seeked to frame {} from {:?}", target, point.checkpoint);
        Ok(point)
    }

    fn require_mode(&self, allowed: &[SessionMode], operation: &'static str) -> Result<(), SessionError> {
        if allowed.contains(&self.mode) {
            Ok(())
        } else {
            Err(SessionError::WrongMode { operation, mode: self.mode })
        }
    }
}

fn initial_state(seed: u64, setup: &GameSetup) -> Result<GameState, GameError> {
    match &setup.layout {
        Some(layout) => GameState::with_layout(seed, setup.ruleset.clone(), layout),
        None => GameState::init(seed, setup.ruleset.clone()),
    }
}

fn check_setup(replay: &Replay, setup: &GameSetup) -> Result<(), SessionError> {
    if replay.level_id() != setup.level_id {
        return Err(SessionError::SetupMismatch("level id"));
    }
    if replay.ruleset_id() != setup.ruleset.name {
        return Err(SessionError::SetupMismatch("ruleset id"));
    }
    Ok(())
}

/// Re-simulate until the cursor stands on `target`, failing on the first
/// checkpoint that does not match.
fn play_forward(
    state: &mut GameState,
    playback: &mut Playback,
    replay: &Replay,
    target: u32,
) -> Result<(), SessionError> {
    while playback.frame() < target {
        loop {
            while let Some((_, checkpoint)) = playback.due_checkpoint(replay) {
                if let Some(info) = compare_checkpoint(&checkpoint, state) {
                    return Err(SessionError::CheckpointMismatch(info));
                }
            }
            let Some(event) = playback.next_event(replay) else { break };
            if let Err(e) = state.apply_input(&event) {
                debug!("Recorded input {:?} rejected while seeking: {}", event.kind, e);
            }
        }
        state.step()?;
        playback.advance_frame();
    }
    Ok(())
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation is not available in this mode.
    #[error("{operation} not allowed in {mode:?} mode")]
    WrongMode {
        /// What was attempted
        operation: &'static str,
        /// Current mode
        mode: SessionMode,
    },

    /// The replay was recorded with a different setup.
    #[error("Replay does not match setup: {0}")]
    SetupMismatch(&'static str),

    /// The recording is already finalized.
    #[error("Session already finished")]
    Finished,

    /// A state snapshot could not be written or read.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    /// A restored state disagrees with its checkpoint.
    #[error("Checkpoint mismatch: {0}")]
    CheckpointMismatch(DesyncInfo),

    /// The game rejected an operation.
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// Replay construction or I/O failed.
    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    /// A golden checksum file is not valid JSON.
    #[error("Golden file error: {0}")]
    Golden(#[from] serde_json::Error),

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// TESTS
// =============================================================================
