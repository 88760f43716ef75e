//! Game Events
//!
//! Telemetry produced by the tick. Events never feed back into the
//! simulation and are not part of any checksum; a bounded log keeps the
//! most recent ones for inspection.

use std::collections::VecDeque;
use serde::{Deserialize, Serialize};

use crate::board::{Bubble, CellCoord, SpecialEffect};
use crate::game::state::{GamePhase, Outcome};

/// Capacity of the recent-event log.
pub const EVENT_LOG_CAPACITY: usize = 64;

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A shot came to rest
    Placed {
        /// Where it landed
        cell: CellCoord,
        /// What landed
        bubble: Bubble,
    },
    /// A match popped
    Popped {
        /// Cells removed
        count: u32,
        /// Points awarded
        points: u32,
        /// Combo level after this pop
        combo: u32,
    },
    /// Orphaned bubbles fell
    Dropped {
        /// Cells removed
        count: u32,
        /// Points awarded
        points: u32,
    },
    /// A special bubble's effect ran
    EffectTriggered {
        /// Where the special was
        cell: CellCoord,
        /// Which effect
        effect: SpecialEffect,
        /// Cells cleared or frozen
        affected: u32,
    },
    /// A pressure row was pushed in
    RowInserted {
        /// Ceiling cursor after the insert
        ceiling: u32,
    },
    /// Hurry mode pushed in a garbage row
    Garbage {
        /// Ceiling cursor after the insert
        ceiling: u32,
    },
    /// Phase transition
    PhaseChanged {
        /// Previous phase
        old_phase: GamePhase,
        /// New phase
        new_phase: GamePhase,
    },
    /// The game ended
    GameOver {
        /// How it ended
        outcome: Outcome,
        /// Final score
        score: u32,
    },
}

/// A game event stamped with the frame it happened on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Frame when the event occurred
    pub frame: u32,
    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(frame: u32, data: GameEventData) -> Self {
        Self { frame, data }
    }

    /// Create placed event.
    pub fn placed(frame: u32, cell: CellCoord, bubble: Bubble) -> Self {
        Self::new(frame, GameEventData::Placed { cell, bubble })
    }

    /// Create phase change event.
    pub fn phase_changed(frame: u32, old_phase: GamePhase, new_phase: GamePhase) -> Self {
        Self::new(frame, GameEventData::PhaseChanged { old_phase, new_phase })
    }

    /// Create game over event.
    pub fn game_over(frame: u32, outcome: Outcome, score: u32) -> Self {
        Self::new(frame, GameEventData::GameOver { outcome, score })
    }
}

/// Fixed-capacity log of recent events; the oldest entry is evicted first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    entries: VecDeque<GameEvent>,
}

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
        }
    }

    /// Append an event, evicting the oldest when full.
    pub fn push(&mut self, event: GameEvent) {
        if self.entries.len() == EVENT_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    /// Number of events held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the log holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.entries.iter()
    }

    /// Most recent event.
    pub fn latest(&self) -> Option<&GameEvent> {
        self.entries.back()
    }
}
