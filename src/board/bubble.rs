//! Cell contents.

use serde::{Deserialize, Serialize};

/// Number of distinct bubble colors.
pub const MAX_COLORS: u8 = 8;

/// Per-bubble modifier bits.
///
/// Layout:
/// - Bit 0: Indestructible (survives pops and effects, still falls when orphaned)
/// - Bit 1: Sticky (catches shots at a wider radius)
/// - Bit 2: Ghost (shots pass through)
/// - Bit 3: Frozen (never matches)
/// - Bit 4: Anchor (holds its cluster up like the ceiling)
/// - Bit 5: Activated (special effect already ran)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BubbleFlags(u8);

impl BubbleFlags {
    /// No flags set
    pub const NONE: Self = Self(0);
    /// Survives pops and effects
    pub const INDESTRUCTIBLE: Self = Self(1 << 0);
    /// Wider contact radius
    pub const STICKY: Self = Self(1 << 1);
    /// Never collides
    pub const GHOST: Self = Self(1 << 2);
    /// Never matches
    pub const FROZEN: Self = Self(1 << 3);
    /// Seeds anchor-finding
    pub const ANCHOR: Self = Self(1 << 4);
    /// Special already triggered
    pub const ACTIVATED: Self = Self(1 << 5);

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build from raw bits, dropping unknown ones.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x3F)
    }

    /// True if every bit of `other` is set.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets.
    #[inline]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Remove the bits of `other`.
    #[inline]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

/// What a special bubble does when it pops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialEffect {
    /// Clears every cell within `payload` hex distance.
    Bomb,
    /// Clears the whole row.
    Lightning,
    /// Clears every bubble of color `payload` (0 = the bomb's own color).
    ColorBomb,
    /// Detonates like a bomb after `payload` frames.
    TimedBomb,
    /// Freezes every bubble within `payload` hex distance.
    Freeze,
}

impl SpecialEffect {
    /// All effects in tag order.
    pub const ALL: [SpecialEffect; 5] = [
        SpecialEffect::Bomb,
        SpecialEffect::Lightning,
        SpecialEffect::ColorBomb,
        SpecialEffect::TimedBomb,
        SpecialEffect::Freeze,
    ];

    /// Stable tag folded into checksums (never 0).
    pub const fn tag(self) -> u8 {
        match self {
            SpecialEffect::Bomb => 1,
            SpecialEffect::Lightning => 2,
            SpecialEffect::ColorBomb => 3,
            SpecialEffect::TimedBomb => 4,
            SpecialEffect::Freeze => 5,
        }
    }

    /// Bit for this effect in a ruleset's allowed-specials mask.
    pub const fn mask_bit(self) -> u8 {
        1 << (self.tag() - 1)
    }

    /// Payload a freshly drawn special carries.
    pub const fn default_payload(self) -> u8 {
        match self {
            SpecialEffect::Bomb => 1,
            SpecialEffect::Lightning => 0,
            SpecialEffect::ColorBomb => 0,
            SpecialEffect::TimedBomb => 90,
            SpecialEffect::Freeze => 2,
        }
    }
}

/// Contents of a single cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bubble {
    /// Nothing here
    #[default]
    Empty,
    /// Plain colored bubble
    Colored {
        /// Color id (0..MAX_COLORS)
        color: u8,
        /// Modifier bits
        flags: BubbleFlags,
    },
    /// Colored bubble with an effect on pop
    Special {
        /// Color id (0..MAX_COLORS)
        color: u8,
        /// Modifier bits
        flags: BubbleFlags,
        /// Effect kind
        effect: SpecialEffect,
        /// Radius, delay or target color depending on `effect`
        payload: u8,
    },
    /// Never matches; cleared only by effects or by falling
    Blocker {
        /// Modifier bits
        flags: BubbleFlags,
    },
    /// Matches any color
    Wildcard {
        /// Modifier bits
        flags: BubbleFlags,
    },
}

impl Bubble {
    /// Plain bubble of `color`.
    #[inline]
    pub const fn colored(color: u8) -> Self {
        Bubble::Colored { color, flags: BubbleFlags::NONE }
    }

    /// Special bubble with the effect's default payload.
    #[inline]
    pub const fn special(color: u8, effect: SpecialEffect) -> Self {
        Bubble::Special {
            color,
            flags: BubbleFlags::NONE,
            effect,
            payload: effect.default_payload(),
        }
    }

    /// True for `Empty`.
    #[inline]
    pub const fn is_empty(self) -> bool {
        matches!(self, Bubble::Empty)
    }

    /// True for anything but `Empty`.
    #[inline]
    pub const fn is_occupied(self) -> bool {
        !self.is_empty()
    }

    /// Modifier bits (empty cells have none).
    #[inline]
    pub const fn flags(self) -> BubbleFlags {
        match self {
            Bubble::Empty => BubbleFlags::NONE,
            Bubble::Colored { flags, .. }
            | Bubble::Special { flags, .. }
            | Bubble::Blocker { flags }
            | Bubble::Wildcard { flags } => flags,
        }
    }

    /// Same bubble with its flags replaced.
    pub fn with_flags(self, new_flags: BubbleFlags) -> Self {
        match self {
            Bubble::Empty => Bubble::Empty,
            Bubble::Colored { color, .. } => Bubble::Colored { color, flags: new_flags },
            Bubble::Special { color, effect, payload, .. } => Bubble::Special {
                color,
                flags: new_flags,
                effect,
                payload,
            },
            Bubble::Blocker { .. } => Bubble::Blocker { flags: new_flags },
            Bubble::Wildcard { .. } => Bubble::Wildcard { flags: new_flags },
        }
    }

    /// True if the cell has every bit of `flag`.
    #[inline]
    pub const fn has_flag(self, flag: BubbleFlags) -> bool {
        self.flags().contains(flag)
    }

    /// Color id for colored and special bubbles.
    #[inline]
    pub const fn color(self) -> Option<u8> {
        match self {
            Bubble::Colored { color, .. } | Bubble::Special { color, .. } => Some(color),
            _ => None,
        }
    }

    /// Whether this cell joins a match of `color`.
    ///
    /// Wildcards match anything; frozen cells, blockers and empty cells
    /// never match.
    pub const fn matches_color(self, color: u8) -> bool {
        if self.has_flag(BubbleFlags::FROZEN) {
            return false;
        }
        match self {
            Bubble::Colored { color: c, .. } | Bubble::Special { color: c, .. } => c == color,
            Bubble::Wildcard { .. } => true,
            Bubble::Empty | Bubble::Blocker { .. } => false,
        }
    }

    /// Stable variant tag folded into checksums.
    pub const fn kind_tag(self) -> u8 {
        match self {
            Bubble::Empty => 0,
            Bubble::Colored { .. } => 1,
            Bubble::Special { .. } => 2,
            Bubble::Blocker { .. } => 3,
            Bubble::Wildcard { .. } => 4,
        }
    }

    /// `(effect tag, payload)` for specials, zeros otherwise.
    pub const fn effect_parts(self) -> (u8, u8) {
        match self {
            Bubble::Special { effect, payload, .. } => (effect.tag(), payload),
            _ => (0, 0),
        }
    }
}
