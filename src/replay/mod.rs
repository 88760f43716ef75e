//! Replay Module
//!
//! A replay is the seed, the level/ruleset identifiers, every accepted
//! input and periodic checkpoints. Nothing derived is stored: playback
//! re-simulates from the seed.
//!
//! ## Format
//!
//! ```text
//! [HEADER 164 bytes] [CHECKPOINT 44 bytes] * N [EVENT 2..10 bytes] * M
//! ```
//!
//! All integers are little-endian. See [`format`] for the field layout.
//!
//! ## Module Structure
//!
//! - `varint`: LEB128 frame deltas
//! - `format`: Replay container, checkpoints, binary codec and file I/O
//! - `playback`: Cursor over a replay with seeking and speed control

pub mod varint;
pub mod format;
pub mod playback;

pub use format::{Checkpoint, Replay, CHECKPOINT_LEN, HEADER_LEN, IDENTIFIER_LEN};
pub use playback::{Playback, SeekPoint};
pub use varint::{decode_varint, encode_varint, varint_len};

/// Magic bytes at the start of every replay file.
pub const MAGIC: [u8; 4] = *b"HXRP";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;

/// Header flag: fire angles are stored as compact u16.
pub const FLAG_COMPACT_ANGLES: u8 = 1 << 0;

/// Most events a replay may hold.
pub const MAX_REPLAY_EVENTS: usize = 1 << 20;

/// Most checkpoints a replay may hold.
pub const MAX_REPLAY_CHECKPOINTS: usize = 1 << 12;

/// Replay construction, codec and file errors.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// Reading or writing the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The buffer ended before a complete record.
    #[error("Truncated replay: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required to finish the record
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// The buffer does not start with `b"HXRP"`.
    #[error("Invalid magic bytes (expected b\"HXRP\")")]
    InvalidMagic,

    /// The format version is not supported by this build.
    #[error("Unsupported format version {found}")]
    UnsupportedVersion {
        /// Version found in the header
        found: u8,
    },

    /// A header field holds an impossible value.
    #[error("Malformed header: {0}")]
    MalformedHeader(&'static str),

    /// An event record could not be decoded.
    #[error("Malformed event {index}: {detail}")]
    MalformedEvent {
        /// Position in the event stream
        index: usize,
        /// What was wrong
        detail: &'static str,
    },

    /// A checkpoint record violates the format invariants.
    #[error("Malformed checkpoint {index}: {detail}")]
    MalformedCheckpoint {
        /// Position in the checkpoint table
        index: usize,
        /// What was wrong
        detail: &'static str,
    },

    /// A frame delta does not fit in 32 bits.
    #[error("Varint overflows 32 bits")]
    VarintOverflow,

    /// Bytes remain after the last declared event.
    #[error("{0} trailing bytes after the last event")]
    TrailingBytes(usize),

    /// Too many events or checkpoints.
    #[error("Capacity exceeded: at most {limit} {what}")]
    CapacityExceeded {
        /// "events" or "checkpoints"
        what: &'static str,
        /// The limit
        limit: usize,
    },

    /// An event or checkpoint was pushed out of frame order.
    #[error("Frame {frame} precedes previous frame {previous}")]
    NonMonotonicFrame {
        /// Frame of the last entry
        previous: u32,
        /// Frame that was rejected
        frame: u32,
    },

    /// A checkpoint refers to events the replay does not have.
    #[error("Invalid checkpoint: {0}")]
    InvalidCheckpoint(&'static str),

    /// An identifier does not fit its header field.
    #[error("{field} identifier is {len} bytes (max 63, no NUL)")]
    IdentifierTooLong {
        /// "level" or "ruleset"
        field: &'static str,
        /// Length in bytes
        len: usize,
    },
}
