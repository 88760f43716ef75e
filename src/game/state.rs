//! Game State
//!
//! The aggregate root of a single game. It is mutated only by
//! [`tick`](crate::game::tick::tick) and by the validated input handlers
//! below, which run between ticks and leave the state untouched when they
//! reject an input.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Bubble, CellCoord, SpecialEffect};
use crate::checksum::state_checksum;
use crate::core::fixed::{
    fixed_clamp, Fixed, AIM_DEFAULT, AIM_MAX, AIM_MIN, ROTATE_STEP, SHOT_SPEED,
};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec2;
use crate::game::events::{EventLog, GameEvent};
use crate::game::input::{InputEvent, InputKind};
use crate::game::ruleset::Ruleset;
use crate::game::shot::Shot;
use crate::game::tick::{tick, TickResult};
use crate::game::effect::StandardEffects;
use crate::game::shot::StandardPhysics;
use crate::game::GameError;

/// Most delayed effects that can wait at once.
pub const MAX_PENDING_EFFECTS: usize = 16;

// =============================================================================
// PHASES AND OUTCOMES
// =============================================================================

/// Current phase of the game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Constructed, not yet ticked
    #[default]
    Init,
    /// Countdown before play
    Ready,
    /// Accepting shots
    Playing,
    /// Frozen until unpaused
    Paused,
    /// Player idled too long; garbage rows incoming
    Hurry,
    /// Settling after a clearing shot
    Animating,
    /// Board cleared
    Won,
    /// Lose condition met
    Lost,
}

impl GamePhase {
    /// Stable code folded into checksums.
    pub const fn code(self) -> u8 {
        match self {
            GamePhase::Init => 0,
            GamePhase::Ready => 1,
            GamePhase::Playing => 2,
            GamePhase::Paused => 3,
            GamePhase::Hurry => 4,
            GamePhase::Animating => 5,
            GamePhase::Won => 6,
            GamePhase::Lost => 7,
        }
    }

    /// Won or Lost.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, GamePhase::Won | GamePhase::Lost)
    }
}

/// How a game ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Still running (or recording stopped early)
    #[default]
    Incomplete,
    /// Board cleared
    Won,
    /// Lose condition met
    Lost,
    /// Player quit
    Abandoned,
}

impl Outcome {
    /// Replay header code.
    pub const fn code(self) -> u8 {
        match self {
            Outcome::Incomplete => 0,
            Outcome::Won => 1,
            Outcome::Lost => 2,
            Outcome::Abandoned => 3,
        }
    }

    /// Parse a replay header code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Outcome::Incomplete),
            1 => Some(Outcome::Won),
            2 => Some(Outcome::Lost),
            3 => Some(Outcome::Abandoned),
            _ => None,
        }
    }
}

/// An effect waiting for its frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEffect {
    /// Where it goes off (tracks pressure rows)
    pub origin: CellCoord,
    /// Effect to run when due
    pub effect: SpecialEffect,
    /// Effect payload
    pub payload: u8,
    /// Color of the special that queued it
    pub color: u8,
    /// First frame it may resolve on
    pub due_frame: u32,
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete state of a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub(crate) seed: u64,
    pub(crate) ruleset: Ruleset,
    pub(crate) board: Board,
    pub(crate) rng: DeterministicRng,
    pub(crate) shot: Shot,
    pub(crate) cannon_angle: Fixed,
    /// `[loaded, next]`; the loaded slot is empty while a shot flies
    pub(crate) queue: [Bubble; 2],
    pub(crate) score: u32,
    pub(crate) combo: u32,
    pub(crate) shots_fired: u32,
    pub(crate) placements: u32,
    pub(crate) frame: u32,
    pub(crate) phase: GamePhase,
    pub(crate) resume_phase: GamePhase,
    pub(crate) phase_timer: u32,
    pub(crate) idle_timer: u32,
    pub(crate) events: EventLog,
    pub(crate) pending_effects: Vec<PendingEffect>,
    pub(crate) outcome: Outcome,
    pub(crate) checksum: u32,

    /// Events generated since the last tick finished
    #[serde(skip)]
    pub(crate) tick_events: Vec<GameEvent>,
}

impl GameState {
    /// New game with `initial_rows` filled from the seeded RNG.
    pub fn init(seed: u64, ruleset: Ruleset) -> Result<Self, GameError> {
        let mut state = Self::blank(seed, ruleset)?;
        for row in 0..state.ruleset.initial_rows as i32 {
            for col in 0..state.board.row_width(row) {
                let color = draw_color(&mut state.rng, &state.ruleset, 0);
                state.board.place(CellCoord::new(row, col), Bubble::colored(color))?;
            }
        }
        state.fill_queue();
        state.refresh_checksum();
        Ok(state)
    }

    /// New game starting from a fixed layout.
    pub fn with_layout(
        seed: u64,
        ruleset: Ruleset,
        layout: &[(CellCoord, Bubble)],
    ) -> Result<Self, GameError> {
        let mut state = Self::blank(seed, ruleset)?;
        for &(cell, bubble) in layout {
            state.board.place(cell, bubble)?;
        }
        state.fill_queue();
        state.refresh_checksum();
        Ok(state)
    }

    fn blank(seed: u64, ruleset: Ruleset) -> Result<Self, GameError> {
        ruleset.validate()?;
        let board = Board::new(ruleset.rows, ruleset.cols)?;
        Ok(Self {
            seed,
            ruleset,
            board,
            rng: DeterministicRng::new(seed),
            shot: Shot::default(),
            cannon_angle: AIM_DEFAULT,
            queue: [Bubble::Empty; 2],
            score: 0,
            combo: 0,
            shots_fired: 0,
            placements: 0,
            frame: 0,
            phase: GamePhase::Init,
            resume_phase: GamePhase::Init,
            phase_timer: 0,
            idle_timer: 0,
            events: EventLog::new(),
            pending_effects: Vec::new(),
            outcome: Outcome::Incomplete,
            checksum: 0,
            tick_events: Vec::new(),
        })
    }

    fn fill_queue(&mut self) {
        self.queue[0] = self.draw_bubble();
        self.queue[1] = self.draw_bubble();
    }

    /// Draw the next queue bubble from the RNG.
    ///
    /// Consumes one draw for the color and, when specials are enabled, one
    /// for the special roll plus one for the effect when it succeeds.
    pub(crate) fn draw_bubble(&mut self) -> Bubble {
        let color = draw_color(&mut self.rng, &self.ruleset, self.board.colors_present());
        if self.ruleset.specials != 0 && self.rng.chance_permille(self.ruleset.special_permille) {
            let allowed: Vec<SpecialEffect> = self.ruleset.allowed_specials().collect();
            if let Some(&effect) = self.rng.choose(&allowed) {
                return Bubble::special(color, effect);
            }
        }
        Bubble::colored(color)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Seed the game was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Active rules.
    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    /// The board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The RNG (read-only).
    pub fn rng(&self) -> &DeterministicRng {
        &self.rng
    }

    /// The shot.
    pub fn shot(&self) -> &Shot {
        &self.shot
    }

    /// Cannon angle in Q16.16 radians.
    pub fn cannon_angle(&self) -> Fixed {
        self.cannon_angle
    }

    /// `[loaded, next]` bubbles.
    pub fn queue(&self) -> [Bubble; 2] {
        self.queue
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Consecutive popping shots.
    pub fn combo(&self) -> u32 {
        self.combo
    }

    /// Shots fired so far.
    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }

    /// Frame counter.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// How the game ended, if it has.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// True once Won or Lost.
    pub fn is_over(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Recent telemetry.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Effects waiting for their frame.
    pub fn pending_effects(&self) -> &[PendingEffect] {
        &self.pending_effects
    }

    /// State checksum as of the last mutation.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Where shots leave the cannon.
    pub fn launch_position(&self) -> FixedVec2 {
        FixedVec2::new(self.board.width() / 2, self.board.launch_y())
    }

    // =========================================================================
    // INPUT HANDLERS
    // =========================================================================

    fn ensure_unpaused(&self) -> Result<(), GameError> {
        if self.phase == GamePhase::Paused {
            return Err(GameError::InvalidState("game is paused"));
        }
        if self.phase.is_terminal() {
            return Err(GameError::InvalidState("game is over"));
        }
        Ok(())
    }

    /// Rotate the cannon one step counter-clockwise.
    pub fn rotate_left(&mut self) -> Result<(), GameError> {
        self.ensure_unpaused()?;
        self.cannon_angle = fixed_clamp(self.cannon_angle + ROTATE_STEP, AIM_MIN, AIM_MAX);
        self.refresh_checksum();
        Ok(())
    }

    /// Rotate the cannon one step clockwise.
    pub fn rotate_right(&mut self) -> Result<(), GameError> {
        self.ensure_unpaused()?;
        self.cannon_angle = fixed_clamp(self.cannon_angle - ROTATE_STEP, AIM_MIN, AIM_MAX);
        self.refresh_checksum();
        Ok(())
    }

    /// Fire the loaded bubble at `angle`.
    pub fn fire(&mut self, angle: Fixed) -> Result<(), GameError> {
        if !(AIM_MIN..=AIM_MAX).contains(&angle) {
            return Err(GameError::InvalidArgument("aim angle out of range"));
        }
        if self.shot.is_active() {
            return Err(GameError::InvalidState("shot already in flight"));
        }
        if !matches!(self.phase, GamePhase::Playing | GamePhase::Hurry) {
            return Err(GameError::InvalidState("cannot fire in this phase"));
        }
        if self.queue[0].is_empty() {
            return Err(GameError::InvalidState("nothing loaded"));
        }

        let bubble = std::mem::take(&mut self.queue[0]);
        self.cannon_angle = angle;
        self.shot = Shot::launch(
            self.launch_position(),
            FixedVec2::from_angle(angle, SHOT_SPEED),
            bubble,
        );
        self.shots_fired += 1;
        self.idle_timer = 0;
        if self.phase == GamePhase::Hurry {
            self.set_phase(GamePhase::Playing);
        }
        self.refresh_checksum();
        Ok(())
    }

    /// Swap the loaded and next bubble.
    pub fn swap(&mut self) -> Result<(), GameError> {
        self.ensure_unpaused()?;
        if self.shot.is_active() {
            return Err(GameError::InvalidState("shot already in flight"));
        }
        if self.phase == GamePhase::Init {
            return Err(GameError::InvalidState("game not started"));
        }
        self.queue.swap(0, 1);
        self.refresh_checksum();
        Ok(())
    }

    /// Pause; ticks only advance the frame counter until unpaused.
    pub fn pause(&mut self) -> Result<(), GameError> {
        self.ensure_unpaused()?;
        if self.phase == GamePhase::Init {
            return Err(GameError::InvalidState("game not started"));
        }
        self.resume_phase = self.phase;
        self.set_phase(GamePhase::Paused);
        self.refresh_checksum();
        Ok(())
    }

    /// Resume the phase that was interrupted by `pause`.
    pub fn unpause(&mut self) -> Result<(), GameError> {
        if self.phase != GamePhase::Paused {
            return Err(GameError::InvalidState("game is not paused"));
        }
        self.set_phase(self.resume_phase);
        self.refresh_checksum();
        Ok(())
    }

    /// Dispatch a recorded input.
    pub fn apply_input(&mut self, input: &InputEvent) -> Result<(), GameError> {
        match input.kind {
            InputKind::RotateLeft => self.rotate_left(),
            InputKind::RotateRight => self.rotate_right(),
            InputKind::Fire { angle } => self.fire(angle),
            InputKind::Switch => self.swap(),
            InputKind::Pause => self.pause(),
            InputKind::Unpause => self.unpause(),
        }
    }

    /// Run one tick with the standard physics and effects.
    pub fn step(&mut self) -> Result<TickResult, GameError> {
        tick(self, &StandardPhysics, &StandardEffects)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Switch phase, recording the transition.
    pub(crate) fn set_phase(&mut self, new_phase: GamePhase) {
        if new_phase != self.phase {
            self.tick_events
                .push(GameEvent::phase_changed(self.frame, self.phase, new_phase));
            self.phase = new_phase;
        }
    }

    /// Queue a telemetry event for the current tick.
    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.tick_events.push(event);
    }

    /// Move this tick's events into the log and hand them out.
    pub(crate) fn take_events(&mut self) -> Vec<GameEvent> {
        let events = std::mem::take(&mut self.tick_events);
        for event in &events {
            self.events.push(event.clone());
        }
        events
    }

    /// Recompute the cached checksum.
    pub(crate) fn refresh_checksum(&mut self) {
        self.checksum = state_checksum(self);
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Serialize the full state using bincode.
    pub fn to_snapshot(&self) -> bincode::Result<Vec<u8>> {
        bincode::serialize(self)
    }

    /// Restore a state serialized with [`GameState::to_snapshot`].
    pub fn from_snapshot(bytes: &[u8]) -> bincode::Result<Self> {
        bincode::deserialize(bytes)
    }
}

/// Pick a color allowed by the ruleset.
///
/// With `draw_from_board_colors`, only colors in `present` are eligible
/// unless that leaves nothing. Always consumes exactly one RNG draw.
pub(crate) fn draw_color(rng: &mut DeterministicRng, ruleset: &Ruleset, present: u8) -> u8 {
    let mut mask = ruleset.color_mask;
    if ruleset.draw_from_board_colors && mask & present != 0 {
        mask &= present;
    }
    let pick = rng.next_int(mask.count_ones());
    (0..8u8)
        .filter(|c| mask & (1 << c) != 0)
        .nth(pick as usize)
        .unwrap_or(0)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::FIXED_HALF_PI;

    fn playing(seed: u64) -> GameState {
        let ruleset = Ruleset { ready_frames: 0, ..Ruleset::default() };
        let mut state = GameState::init(seed, ruleset).unwrap();
        while state.phase() != GamePhase::Playing {
            state.step().unwrap();
        }
        state
    }

    #[test]
    fn test_same_seed_same_state() {
        let a = GameState::init(12345, Ruleset::default()).unwrap();
        let b = GameState::init(12345, Ruleset::default()).unwrap();
        assert_eq!(a.queue(), b.queue());
        assert_eq!(a.checksum(), b.checksum());
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = GameState::init(1, Ruleset::default()).unwrap();
        let b = GameState::init(2, Ruleset::default()).unwrap();
        assert_ne!(a.board(), b.board());
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn test_initial_fill() {
        let state = GameState::init(7, Ruleset::default()).unwrap();
        // 5 rows alternating 8 / 7 cells
        assert_eq!(state.board().occupied_count(), 8 + 7 + 8 + 7 + 8);
        assert_eq!(state.phase(), GamePhase::Init);
        assert_eq!(state.frame(), 0);
        assert!(state.queue().iter().all(|b| b.is_occupied()));
    }

    #[test]
    fn test_invalid_ruleset_rejected() {
        let ruleset = Ruleset { rows: 0, ..Ruleset::default() };
        assert!(matches!(
            GameState::init(1, ruleset),
            Err(GameError::InvalidRuleset(_))
        ));
    }

    #[test]
    fn test_layout_errors_propagate() {
        let layout = [(CellCoord::new(1, 7), Bubble::colored(0))];
        assert!(matches!(
            GameState::with_layout(1, Ruleset::default(), &layout),
            Err(GameError::Board(_))
        ));
    }

    #[test]
    fn test_fire_rejected_before_play() {
        let mut state = GameState::init(3, Ruleset::default()).unwrap();
        let before = state.clone();
        assert_eq!(
            state.fire(FIXED_HALF_PI),
            Err(GameError::InvalidState("cannot fire in this phase"))
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_fire_validates_angle() {
        let mut state = playing(3);
        let before = state.clone();
        assert!(matches!(state.fire(0), Err(GameError::InvalidArgument(_))));
        assert!(matches!(state.fire(AIM_MAX + 1), Err(GameError::InvalidArgument(_))));
        assert_eq!(state, before);
    }

    #[test]
    fn test_fire_launches_and_blocks_second_shot() {
        let mut state = playing(3);
        let loaded = state.queue()[0];
        state.fire(FIXED_HALF_PI).unwrap();
        assert!(state.shot().is_active());
        assert_eq!(state.shot().bubble, loaded);
        assert!(state.queue()[0].is_empty());
        assert_eq!(state.shots_fired(), 1);

        assert!(matches!(state.fire(FIXED_HALF_PI), Err(GameError::InvalidState(_))));
        assert!(matches!(state.swap(), Err(GameError::InvalidState(_))));
    }

    #[test]
    fn test_rotation_clamps() {
        let mut state = playing(4);
        for _ in 0..200 {
            state.rotate_left().unwrap();
        }
        assert_eq!(state.cannon_angle(), AIM_MAX);
        for _ in 0..200 {
            state.rotate_right().unwrap();
        }
        assert_eq!(state.cannon_angle(), AIM_MIN);
    }

    #[test]
    fn test_swap() {
        let mut state = playing(5);
        let [a, b] = state.queue();
        state.swap().unwrap();
        assert_eq!(state.queue(), [b, a]);
    }

    #[test]
    fn test_pause_round_trip() {
        let mut state = playing(6);
        assert!(matches!(state.unpause(), Err(GameError::InvalidState(_))));
        state.pause().unwrap();
        assert_eq!(state.phase(), GamePhase::Paused);
        assert!(matches!(state.pause(), Err(GameError::InvalidState(_))));
        assert!(matches!(state.rotate_left(), Err(GameError::InvalidState(_))));
        state.unpause().unwrap();
        assert_eq!(state.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut state = playing(8);
        state.fire(FIXED_HALF_PI).unwrap();
        for _ in 0..5 {
            state.step().unwrap();
        }
        let bytes = state.to_snapshot().unwrap();
        let restored = GameState::from_snapshot(&bytes).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.checksum(), state_checksum(&restored));
    }

    #[test]
    fn test_draw_color_respects_board() {
        let ruleset = Ruleset { color_mask: 0b1111, ..Ruleset::default() };
        let mut rng = DeterministicRng::new(9);
        for _ in 0..100 {
            assert_eq!(draw_color(&mut rng, &ruleset, 0b0100), 2);
            assert!(draw_color(&mut rng, &ruleset, 0b1_0000) < 4);
        }
    }
}
