//! Authoritative Simulation Tick
//!
//! The core game loop that must be 100% deterministic. Replays, twin
//! simulations and golden fixtures all reduce to calling [`tick`] with the
//! same physics and effect rules.

use crate::board::{BoardError, Bubble, BubbleFlags, CellCoord, SpecialEffect, VisitResult, BOARD_CAPACITY};
use crate::core::fixed::BUBBLE_RADIUS;
use crate::game::effect::{EffectAction, EffectResolver};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::ruleset::LoseCondition;
use crate::game::shot::{Collision, Shot, ShotPhase, ShotPhysics, Walls};
use crate::game::state::{draw_color, GamePhase, GameState, Outcome, PendingEffect, MAX_PENDING_EFFECTS};
use crate::game::GameError;

/// Result of a tick.
#[derive(Debug, Clone, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Cell the shot came to rest in, if it landed this tick
    pub placed: Option<CellCoord>,
    /// Whether the game is over
    pub game_over: bool,
    /// Outcome as of the end of the tick
    pub outcome: Outcome,
}

/// A special whose effect is about to run.
#[derive(Clone, Copy, Debug)]
struct Trigger {
    origin: CellCoord,
    effect: SpecialEffect,
    payload: u8,
    color: u8,
}

impl From<PendingEffect> for Trigger {
    fn from(pending: PendingEffect) -> Self {
        Self {
            origin: pending.origin,
            effect: pending.effect,
            payload: pending.payload,
            color: pending.color,
        }
    }
}

/// Run one simulation tick.
///
/// # Arguments
///
/// * `state` - The game state (will be mutated)
/// * `physics` - Moves the shot
/// * `effects` - Resolves special bubbles
///
/// # Determinism
///
/// This function is 100% deterministic:
/// - Fixed step order, row-major board scans
/// - Uses fixed-point math only
/// - Uses deterministic RNG (state.rng)
/// - No system calls, no floating point
///
/// Errors only surface from broken invariants (a bubble placed on an
/// occupied cell, a trigger chain beyond board capacity).
pub fn tick<P, E>(state: &mut GameState, physics: &P, effects: &E) -> Result<TickResult, GameError>
where
    P: ShotPhysics + ?Sized,
    E: EffectResolver + ?Sized,
{
    let mut result = TickResult::default();

    if state.phase.is_terminal() {
        result.game_over = true;
        result.outcome = state.outcome;
        return Ok(result);
    }

    // 1. Phase bookkeeping (countdowns, pause, hurry)
    let running = update_phase(state)?;

    if running && !state.phase.is_terminal() {
        // 2. Move the shot and snap it if it hit something
        result.placed = advance_shot(state, physics)?;

        if let Some(cell) = result.placed {
            // 3. Matches, effects, orphans
            resolve_placement(state, effects, cell)?;

            // 4. Pressure rows
            if !state.phase.is_terminal() {
                apply_pressure(state)?;
            }

            // 5. Advance the queue
            if !state.phase.is_terminal() {
                let next = state.draw_bubble();
                state.queue[0] = std::mem::replace(&mut state.queue[1], next);
                state.shot = Shot::aiming();
            }
        }

        // 6. Delayed effects
        if !state.phase.is_terminal() {
            resolve_pending(state, effects)?;
        }

        // 7. Win / lose
        if !state.phase.is_terminal() {
            check_end_conditions(state);
        }
    }

    // 8. Advance frame, checksum, hand out events
    state.frame += 1;
    state.refresh_checksum();
    result.events = state.take_events();
    result.game_over = state.phase.is_terminal();
    result.outcome = state.outcome;

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(
        frame = state.frame,
        phase = ?state.phase,
        checksum = state.checksum,
        events = result.events.len(),
        "tick"
    );

    Ok(result)
}

/// Countdowns and idle tracking. Returns false while paused.
fn update_phase(state: &mut GameState) -> Result<bool, GameError> {
    match state.phase {
        GamePhase::Init => {
            state.phase_timer = state.ruleset.ready_frames;
            state.set_phase(GamePhase::Ready);
        }
        GamePhase::Ready => {
            if state.phase_timer == 0 {
                state.shot = Shot::aiming();
                state.set_phase(GamePhase::Playing);
            } else {
                state.phase_timer -= 1;
            }
        }
        GamePhase::Paused => return Ok(false),
        GamePhase::Animating => {
            if state.phase_timer == 0 {
                state.set_phase(GamePhase::Playing);
            } else {
                state.phase_timer -= 1;
            }
        }
        GamePhase::Playing | GamePhase::Hurry => update_idle(state)?,
        GamePhase::Won | GamePhase::Lost => {}
    }
    Ok(true)
}

fn update_idle(state: &mut GameState) -> Result<(), GameError> {
    if state.ruleset.hurry_after == 0 || state.shot.phase != ShotPhase::Aiming {
        return Ok(());
    }

    state.idle_timer = state.idle_timer.saturating_add(1);
    match state.phase {
        GamePhase::Playing if state.idle_timer >= state.ruleset.hurry_after => {
            state.idle_timer = 0;
            state.set_phase(GamePhase::Hurry);
        }
        GamePhase::Hurry if state.idle_timer >= state.ruleset.hurry_timeout => {
            state.idle_timer = 0;
            if push_row(state)? {
                let ceiling = state.board.ceiling();
                state.push_event(GameEvent::new(state.frame, GameEventData::Garbage { ceiling }));
            } else {
                finish(state, Outcome::Lost);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Step a moving shot; returns the cell it was placed in.
fn advance_shot<P>(state: &mut GameState, physics: &P) -> Result<Option<CellCoord>, GameError>
where
    P: ShotPhysics + ?Sized,
{
    if state.shot.phase != ShotPhase::Moving {
        return Ok(None);
    }

    let walls = Walls::of(&state.board);
    let outcome = physics.step(&state.shot, &state.board, BUBBLE_RADIUS, walls);
    state.shot = outcome.shot;

    let limit = state.ruleset.max_bounces;
    if outcome.collision == Collision::Wall && limit > 0 && state.shot.bounces > limit {
        state.shot.phase = ShotPhase::Collided;
    }
    if state.shot.phase != ShotPhase::Collided {
        return Ok(None);
    }

    state.shot.phase = ShotPhase::Snapping;
    match state.board.find_snap_cell(state.shot.position) {
        Ok(cell) => {
            let bubble = state.shot.bubble;
            state.board.place(cell, bubble)?;
            state.shot = Shot::default();
            state.push_event(GameEvent::placed(state.frame, cell, bubble));
            Ok(Some(cell))
        }
        Err(BoardError::Overflow) => {
            finish(state, Outcome::Lost);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn resolve_placement<E>(state: &mut GameState, effects: &E, cell: CellCoord) -> Result<(), GameError>
where
    E: EffectResolver + ?Sized,
{
    let matches = state.board.find_matches(cell)?;
    let mut cleared = 0;

    if matches.len() >= state.ruleset.match_threshold as usize {
        state.combo += 1;
        let mut triggers = Vec::new();
        let popped = remove_cells(state, &matches, &mut triggers)?;

        let base = popped.saturating_mul(state.ruleset.pop_points);
        let bonus = popped
            .saturating_mul(state.ruleset.combo_bonus)
            .saturating_mul(state.combo - 1);
        let points = base.saturating_add(bonus);
        state.score = state.score.saturating_add(points);
        state.push_event(GameEvent::new(
            state.frame,
            GameEventData::Popped { count: popped, points, combo: state.combo },
        ));

        cleared += popped;
        cleared += run_triggers(state, effects, triggers)?;
    } else {
        state.combo = 0;
    }

    if cleared > 0 {
        cleared += drop_orphans(state)?;
    }

    state.placements += 1;
    if cleared > 0 && state.ruleset.settle_frames > 0 {
        state.phase_timer = state.ruleset.settle_frames;
        state.set_phase(GamePhase::Animating);
    }
    Ok(())
}

/// Clear `cells`, sparing indestructible ones. Unactivated specials among
/// them are queued in `triggers`. Returns how many cells were cleared.
fn remove_cells(
    state: &mut GameState,
    cells: &VisitResult,
    triggers: &mut Vec<Trigger>,
) -> Result<u32, GameError> {
    let mut removed = 0;
    for &cell in cells {
        let bubble = state.board.bubble_at(cell);
        if bubble.is_empty() || bubble.has_flag(BubbleFlags::INDESTRUCTIBLE) {
            continue;
        }
        if let Bubble::Special { color, flags, effect, payload } = bubble {
            if !flags.contains(BubbleFlags::ACTIVATED) {
                queue_trigger(triggers, Trigger { origin: cell, effect, payload, color })?;
            }
        }
        state.board.clear_cell(cell)?;
        removed += 1;
    }
    Ok(removed)
}

fn queue_trigger(triggers: &mut Vec<Trigger>, trigger: Trigger) -> Result<(), GameError> {
    if triggers.len() >= BOARD_CAPACITY {
        return Err(BoardError::CapacityExceeded(BOARD_CAPACITY).into());
    }
    triggers.push(trigger);
    Ok(())
}

/// Run triggered effects, including any they chain into. Returns how many
/// cells were cleared.
fn run_triggers<E>(state: &mut GameState, effects: &E, mut triggers: Vec<Trigger>) -> Result<u32, GameError>
where
    E: EffectResolver + ?Sized,
{
    let mut cleared = 0;
    let mut next = 0;

    while let Some(&trigger) = triggers.get(next) {
        next += 1;
        let outcome = effects.resolve(
            &state.board,
            trigger.origin,
            trigger.effect,
            trigger.payload,
            trigger.color,
        )?;

        if outcome.delay > 0 {
            let bomb = SpecialEffect::Bomb;
            if state.pending_effects.len() < MAX_PENDING_EFFECTS {
                state.pending_effects.push(PendingEffect {
                    origin: trigger.origin,
                    effect: bomb,
                    payload: bomb.default_payload(),
                    color: trigger.color,
                    due_frame: state.frame.saturating_add(outcome.delay),
                });
            } else {
                // No room to wait: go off now
                queue_trigger(
                    &mut triggers,
                    Trigger { effect: bomb, payload: bomb.default_payload(), ..trigger },
                )?;
            }
            continue;
        }

        let affected = match outcome.action {
            EffectAction::Remove => {
                let removed = remove_cells(state, &outcome.cells, &mut triggers)?;
                cleared += removed;
                removed
            }
            EffectAction::Freeze => freeze_cells(state, &outcome.cells)?,
        };

        state.score = state.score.saturating_add(outcome.bonus);
        state.push_event(GameEvent::new(
            state.frame,
            GameEventData::EffectTriggered { cell: trigger.origin, effect: trigger.effect, affected },
        ));
    }

    Ok(cleared)
}

fn freeze_cells(state: &mut GameState, cells: &VisitResult) -> Result<u32, GameError> {
    let mut frozen = 0;
    for &cell in cells {
        let bubble = state.board.bubble_at(cell);
        if bubble.is_occupied() {
            state.board.set(cell, bubble.with_flags(bubble.flags().with(BubbleFlags::FROZEN)))?;
            frozen += 1;
        }
    }
    Ok(frozen)
}

/// Drop everything no longer hanging from the ceiling or an anchor.
fn drop_orphans(state: &mut GameState) -> Result<u32, GameError> {
    let orphans = state.board.find_orphans()?;
    if orphans.is_empty() {
        return Ok(0);
    }

    let count = state.board.remove_cells(&orphans)? as u32;
    let points = state.ruleset.drop_points.saturating_mul(1 << count.min(10));
    state.score = state.score.saturating_add(points);
    state.push_event(GameEvent::new(state.frame, GameEventData::Dropped { count, points }));
    Ok(count)
}

/// Insert a pressure row every `row_insert_interval` placements.
fn apply_pressure(state: &mut GameState) -> Result<(), GameError> {
    let interval = state.ruleset.row_insert_interval;
    if interval == 0 || state.placements % interval != 0 {
        return Ok(());
    }

    if push_row(state)? {
        let ceiling = state.board.ceiling();
        state.push_event(GameEvent::new(state.frame, GameEventData::RowInserted { ceiling }));
    } else {
        finish(state, Outcome::Lost);
    }
    Ok(())
}

/// Push a new RNG-filled row in from the top. Returns false on overflow.
fn push_row(state: &mut GameState) -> Result<bool, GameError> {
    let rng = &mut state.rng;
    let ruleset = &state.ruleset;
    match state.board.insert_row(|_| Bubble::colored(draw_color(rng, ruleset, 0))) {
        Ok(()) => {}
        Err(BoardError::Overflow) => return Ok(false),
        Err(e) => return Err(e.into()),
    }

    // Waiting effects move down with the bubbles around them
    let rows = state.board.rows();
    for pending in &mut state.pending_effects {
        pending.origin.row += 1;
    }
    state.pending_effects.retain(|p| p.origin.row < rows);
    Ok(true)
}

fn resolve_pending<E>(state: &mut GameState, effects: &E) -> Result<(), GameError>
where
    E: EffectResolver + ?Sized,
{
    if state.pending_effects.is_empty() {
        return Ok(());
    }

    let frame = state.frame;
    let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending_effects)
        .into_iter()
        .partition(|p| p.due_frame <= frame);
    state.pending_effects = waiting;
    if due.is_empty() {
        return Ok(());
    }

    let triggers = due.into_iter().map(Trigger::from).collect();
    if run_triggers(state, effects, triggers)? > 0 {
        drop_orphans(state)?;
    }
    Ok(())
}

fn check_end_conditions(state: &mut GameState) {
    if state.board.is_empty() {
        finish(state, Outcome::Won);
        return;
    }

    let lost = match state.ruleset.lose_condition {
        LoseCondition::Overflow { line } => state
            .board
            .lowest_occupied_row()
            .map_or(false, |row| row >= line as i32),
        LoseCondition::Timeout { frames } => state.frame.saturating_add(1) >= frames,
        LoseCondition::ShotsExhausted { shots } => {
            state.shots_fired >= shots
                && !state.shot.is_active()
                && state.pending_effects.is_empty()
        }
    };
    if lost {
        finish(state, Outcome::Lost);
    }
}

fn finish(state: &mut GameState, outcome: Outcome) {
    let phase = if outcome == Outcome::Won { GamePhase::Won } else { GamePhase::Lost };
    state.outcome = outcome;
    state.shot = Shot::default();
    state.set_phase(phase);
    state.push_event(GameEvent::game_over(state.frame, outcome, state.score));
}
