//! Ruleset and game setup configuration.
//!
//! Rulesets are plain data: loading them from JSON files is the caller's
//! business. Everything here derives serde so callers can do exactly that,
//! and [`Ruleset::validate`] rejects values the simulation cannot honor.

use serde::{Deserialize, Serialize};

use crate::board::{Bubble, CellCoord, SpecialEffect, MAX_COLORS, MAX_COLS, MAX_ROWS};
use crate::game::GameError;

/// Longest identifier a replay header can store.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// How a game is lost (besides physical overflow, which always loses).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoseCondition {
    /// Any bubble at or below row `line`.
    Overflow {
        /// First forbidden row
        line: u8,
    },
    /// The frame counter reaches `frames`.
    Timeout {
        /// Frame limit
        frames: u32,
    },
    /// `shots` shots fired and the last one has settled.
    ShotsExhausted {
        /// Shot limit
        shots: u32,
    },
}

/// Complete rules of a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ruleset {
    /// Identifier stored in replay headers
    pub name: String,
    /// Board rows
    pub rows: u8,
    /// Cells in a full row
    pub cols: u8,
    /// Cluster size that pops
    pub match_threshold: u8,
    /// Colors in play (bit `n` = color `n`)
    pub color_mask: u8,
    /// Only draw colors still on the board
    pub draw_from_board_colors: bool,
    /// Allowed specials (see [`SpecialEffect::mask_bit`])
    pub specials: u8,
    /// Chance a drawn bubble is special, per mille
    pub special_permille: u16,
    /// Rows filled at start when no layout is given
    pub initial_rows: u8,
    /// Lose condition
    pub lose_condition: LoseCondition,
    /// Insert a pressure row every N placements (0 = never)
    pub row_insert_interval: u32,
    /// Countdown before play starts
    pub ready_frames: u32,
    /// Pause after a shot that cleared bubbles
    pub settle_frames: u32,
    /// Idle frames before hurry mode (0 = never)
    pub hurry_after: u32,
    /// Idle frames in hurry mode before a garbage row
    pub hurry_timeout: u32,
    /// Points per popped bubble
    pub pop_points: u32,
    /// Base points for dropped bubbles
    pub drop_points: u32,
    /// Extra points per pop per combo level
    pub combo_bonus: u32,
    /// Wall bounces before a shot stops where it is (0 = unlimited)
    pub max_bounces: u8,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self {
            name: "classic".to_string(),
            rows: 12,
            cols: 8,
            match_threshold: 3,
            color_mask: 0b1111,
            draw_from_board_colors: true,
            specials: 0b1_1111,
            special_permille: 40,
            initial_rows: 5,
            lose_condition: LoseCondition::Overflow { line: 11 },
            row_insert_interval: 8,
            ready_frames: 30,
            settle_frames: 12,
            hurry_after: 300,
            hurry_timeout: 180,
            pop_points: 10,
            drop_points: 20,
            combo_bonus: 5,
            max_bounces: 12,
        }
    }
}

impl Ruleset {
    /// Check every field against what the board and replay format support.
    pub fn validate(&self) -> Result<(), GameError> {
        let fail = |reason: &'static str| Err(GameError::InvalidRuleset(reason));

        if self.name.is_empty() || self.name.len() > MAX_IDENTIFIER_LEN {
            return fail("name must be 1-63 bytes");
        }
        if self.rows == 0 || self.rows as usize > MAX_ROWS {
            return fail("rows out of range");
        }
        if self.cols < 2 || self.cols as usize > MAX_COLS {
            return fail("cols out of range");
        }
        if self.match_threshold < 2 {
            return fail("match threshold must be at least 2");
        }
        if self.color_mask == 0 {
            return fail("color mask is empty");
        }
        if self.specials & !0b1_1111 != 0 {
            return fail("unknown special in mask");
        }
        if self.special_permille > 1000 {
            return fail("special chance above 1000 per mille");
        }
        if self.initial_rows > self.rows {
            return fail("initial rows exceed board rows");
        }
        match self.lose_condition {
            LoseCondition::Overflow { line } if line == 0 || line > self.rows => {
                return fail("overflow line outside the board");
            }
            LoseCondition::Timeout { frames: 0 } => return fail("timeout of zero frames"),
            LoseCondition::ShotsExhausted { shots: 0 } => return fail("shot limit of zero"),
            _ => {}
        }
        if self.hurry_after > 0 && self.hurry_timeout == 0 {
            return fail("hurry timeout must be positive when hurry is enabled");
        }
        Ok(())
    }

    /// Colors allowed by the ruleset, ascending.
    pub fn colors(&self) -> impl Iterator<Item = u8> + '_ {
        (0..MAX_COLORS).filter(move |c| self.color_mask & (1 << c) != 0)
    }

    /// Specials allowed by the ruleset, in tag order.
    pub fn allowed_specials(&self) -> impl Iterator<Item = SpecialEffect> + '_ {
        SpecialEffect::ALL
            .into_iter()
            .filter(move |e| self.specials & e.mask_bit() != 0)
    }
}

/// Everything needed to reproduce a game besides the seed and inputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    /// Level identifier stored in replay headers
    pub level_id: String,
    /// Rules
    pub ruleset: Ruleset,
    /// Fixed starting layout; `None` fills `initial_rows` from the RNG
    pub layout: Option<Vec<(CellCoord, Bubble)>>,
}

impl GameSetup {
    /// Random-fill setup.
    pub fn new(level_id: impl Into<String>, ruleset: Ruleset) -> Self {
        Self {
            level_id: level_id.into(),
            ruleset,
            layout: None,
        }
    }

    /// Use a fixed starting layout.
    pub fn with_layout(mut self, layout: Vec<(CellCoord, Bubble)>) -> Self {
        self.layout = Some(layout);
        self
    }
}
