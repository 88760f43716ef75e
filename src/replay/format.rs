//! Replay container and binary codec.
//!
//! Header layout (164 bytes):
//!
//! ```text
//! offset  size  field
//!      0     4  magic b"HXRP"
//!      4     1  version
//!      5     1  flags (bit 0: compact fire angles)
//!      6     2  reserved
//!      8     8  seed
//!     16    64  level id, NUL padded
//!     80    64  ruleset id, NUL padded
//!    144     4  event count
//!    148     4  checkpoint count
//!    152     4  duration (frames)
//!    156     4  final score
//!    160     1  outcome
//!    161     3  reserved
//! ```
//!
//! Checkpoints follow as fixed 44-byte records, then the event stream.
//! Each event is a header byte `[type:4][flags:2][size:2]`, a varint frame
//! delta from the previous event, and 0, 2 or 4 payload bytes.

use std::borrow::Cow;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::checksum::board_checksum;
use crate::core::fixed::Fixed;
use crate::game::input::{dequantize_angle, quantize_angle, InputEvent, InputKind};
use crate::game::ruleset::{GameSetup, MAX_IDENTIFIER_LEN};
use crate::game::state::{GameState, Outcome};
use crate::replay::varint::{decode_varint, encode_varint};
use crate::replay::{
    ReplayError, FLAG_COMPACT_ANGLES, FORMAT_VERSION, MAGIC, MAX_REPLAY_CHECKPOINTS,
    MAX_REPLAY_EVENTS,
};

/// Size of the fixed header.
pub const HEADER_LEN: usize = 164;

/// Size of one checkpoint record.
pub const CHECKPOINT_LEN: usize = 44;

/// Size of an identifier field.
pub const IDENTIFIER_LEN: usize = 64;

const SIZE_NONE: u8 = 0b00;
const SIZE_U16: u8 = 0b01;
const SIZE_I32: u8 = 0b10;

// =============================================================================
// CHECKPOINT
// =============================================================================

/// Full fingerprint of the game at a frame, plus where the event stream
/// stood, so playback can seek without scanning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Frame the fingerprint was taken at (before that frame's inputs)
    pub frame: u32,
    /// Events recorded before this checkpoint
    pub event_index: u32,
    /// Full state checksum
    pub state_checksum: u32,
    /// Board checksum
    pub board_checksum: u32,
    /// RNG state words
    pub rng_state: [u32; 4],
    /// Score
    pub score: u32,
    /// Shots fired
    pub shots_fired: u32,
}

impl Checkpoint {
    /// Capture `state` with `event_index` events already recorded.
    pub fn capture(state: &GameState, event_index: u32) -> Self {
        Self {
            frame: state.frame(),
            event_index,
            state_checksum: state.checksum(),
            board_checksum: board_checksum(state.board()),
            rng_state: state.rng().state(),
            score: state.score(),
            shots_fired: state.shots_fired(),
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.frame.to_le_bytes());
        out.extend_from_slice(&self.event_index.to_le_bytes());
        out.extend_from_slice(&self.state_checksum.to_le_bytes());
        out.extend_from_slice(&self.board_checksum.to_le_bytes());
        for word in self.rng_state {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.extend_from_slice(&self.score.to_le_bytes());
        out.extend_from_slice(&self.shots_fired.to_le_bytes());
        // Reserved
        out.extend_from_slice(&[0; 4]);
    }

    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, ReplayError> {
        let frame = reader.u32()?;
        let event_index = reader.u32()?;
        let state_checksum = reader.u32()?;
        let board_checksum = reader.u32()?;
        let mut rng_state = [0u32; 4];
        for word in &mut rng_state {
            *word = reader.u32()?;
        }
        let score = reader.u32()?;
        let shots_fired = reader.u32()?;
        reader.take(4)?;
        Ok(Self {
            frame,
            event_index,
            state_checksum,
            board_checksum,
            rng_state,
            score,
            shots_fired,
        })
    }
}

// =============================================================================
// REPLAY
// =============================================================================

/// A recorded game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Replay {
    version: u8,
    flags: u8,
    seed: u64,
    level_id: String,
    ruleset_id: String,
    duration: u32,
    final_score: u32,
    outcome: Outcome,
    events: Vec<InputEvent>,
    checkpoints: Vec<Checkpoint>,
}

fn check_identifier(field: &'static str, id: &str) -> Result<(), ReplayError> {
    if id.len() > MAX_IDENTIFIER_LEN || id.as_bytes().contains(&0) {
        return Err(ReplayError::IdentifierTooLong { field, len: id.len() });
    }
    Ok(())
}

impl Replay {
    /// Empty replay for a game seeded with `seed`.
    pub fn new(
        seed: u64,
        level_id: impl Into<String>,
        ruleset_id: impl Into<String>,
        compact_angles: bool,
    ) -> Result<Self, ReplayError> {
        let level_id = level_id.into();
        let ruleset_id = ruleset_id.into();
        check_identifier("level", &level_id)?;
        check_identifier("ruleset", &ruleset_id)?;

        Ok(Self {
            version: FORMAT_VERSION,
            flags: if compact_angles { FLAG_COMPACT_ANGLES } else { 0 },
            seed,
            level_id,
            ruleset_id,
            duration: 0,
            final_score: 0,
            outcome: Outcome::Incomplete,
            events: Vec::new(),
            checkpoints: Vec::new(),
        })
    }

    /// Empty replay identified by `setup`'s level and ruleset names.
    pub fn for_setup(seed: u64, setup: &GameSetup, compact_angles: bool) -> Result<Self, ReplayError> {
        Self::new(seed, setup.level_id.clone(), setup.ruleset.name.clone(), compact_angles)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Format version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Raw header flags.
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Whether fire angles are stored compactly.
    pub fn compact_angles(&self) -> bool {
        self.flags & FLAG_COMPACT_ANGLES != 0
    }

    /// Seed the game was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Level identifier.
    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    /// Ruleset identifier.
    pub fn ruleset_id(&self) -> &str {
        &self.ruleset_id
    }

    /// Frames recorded.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Score at the end of the recording.
    pub fn final_score(&self) -> u32 {
        self.final_score
    }

    /// How the recorded game ended.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Recorded inputs in frame order.
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Checkpoints in frame order.
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Number of events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Number of checkpoints.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Checkpoint with the greatest frame not after `frame`, with its index.
    pub fn checkpoint_at_or_before(&self, frame: u32) -> Option<(usize, &Checkpoint)> {
        let idx = self.checkpoints.partition_point(|cp| cp.frame <= frame);
        idx.checked_sub(1).map(|i| (i, &self.checkpoints[i]))
    }

    // =========================================================================
    // RECORDING
    // =========================================================================

    /// Append an input. Frames must not go backwards.
    ///
    /// With compact angles the fire angle is stored snapped to the compact
    /// grid, exactly as it will read back.
    pub fn push_event(&mut self, event: InputEvent) -> Result<(), ReplayError> {
        if self.events.len() >= MAX_REPLAY_EVENTS {
            return Err(ReplayError::CapacityExceeded { what: "events", limit: MAX_REPLAY_EVENTS });
        }
        if let Some(last) = self.events.last() {
            if event.frame < last.frame {
                return Err(ReplayError::NonMonotonicFrame { previous: last.frame, frame: event.frame });
            }
        }

        let kind = if self.compact_angles() { event.kind.quantized() } else { event.kind };
        self.events.push(InputEvent::new(event.frame, kind));
        Ok(())
    }

    /// Append a checkpoint. Frames must not go backwards and the event
    /// index must not run past the recorded events.
    pub fn push_checkpoint(&mut self, checkpoint: Checkpoint) -> Result<(), ReplayError> {
        if self.checkpoints.len() >= MAX_REPLAY_CHECKPOINTS {
            return Err(ReplayError::CapacityExceeded {
                what: "checkpoints",
                limit: MAX_REPLAY_CHECKPOINTS,
            });
        }
        if let Some(last) = self.checkpoints.last() {
            if checkpoint.frame < last.frame {
                return Err(ReplayError::NonMonotonicFrame {
                    previous: last.frame,
                    frame: checkpoint.frame,
                });
            }
        }
        if checkpoint.event_index as usize > self.events.len() {
            return Err(ReplayError::InvalidCheckpoint("event index past the recorded events"));
        }
        self.checkpoints.push(checkpoint);
        Ok(())
    }

    /// Record the end-of-game header fields.
    pub fn finalize(&mut self, duration: u32, final_score: u32, outcome: Outcome) {
        self.duration = duration;
        self.final_score = final_score;
        self.outcome = outcome;
    }

    // =========================================================================
    // CODEC
    // =========================================================================

    /// Encode to the binary format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            HEADER_LEN + self.checkpoints.len() * CHECKPOINT_LEN + self.events.len() * 3,
        );

        out.extend_from_slice(&MAGIC);
        out.push(self.version);
        out.push(self.flags);
        out.extend_from_slice(&[0; 2]);
        out.extend_from_slice(&self.seed.to_le_bytes());
        write_identifier(&mut out, &self.level_id);
        write_identifier(&mut out, &self.ruleset_id);
        out.extend_from_slice(&(self.events.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.checkpoints.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.duration.to_le_bytes());
        out.extend_from_slice(&self.final_score.to_le_bytes());
        out.push(self.outcome.code());
        out.extend_from_slice(&[0; 3]);

        for checkpoint in &self.checkpoints {
            checkpoint.encode(&mut out);
        }

        let compact = self.compact_angles();
        let mut previous = 0;
        for event in &self.events {
            encode_event(&mut out, event, event.frame - previous, compact);
            previous = event.frame;
        }
        out
    }

    /// Decode from the binary format.
    ///
    /// Either the whole buffer is valid and a replay is returned, or an
    /// error is; trailing bytes count as an error.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ReplayError> {
        let mut reader = ByteReader::new(bytes);

        if reader.take(4)? != MAGIC {
            return Err(ReplayError::InvalidMagic);
        }
        let version = reader.u8()?;
        if version != FORMAT_VERSION {
            return Err(ReplayError::UnsupportedVersion { found: version });
        }
        let flags = reader.u8()?;
        if flags & !FLAG_COMPACT_ANGLES != 0 {
            return Err(ReplayError::MalformedHeader("unknown flag bits"));
        }
        reader.take(2)?;
        let seed = reader.u64()?;
        let level_id = read_identifier(&mut reader)?;
        let ruleset_id = read_identifier(&mut reader)?;
        let event_count = reader.u32()? as usize;
        let checkpoint_count = reader.u32()? as usize;
        let duration = reader.u32()?;
        let final_score = reader.u32()?;
        let outcome = Outcome::from_code(reader.u8()?)
            .ok_or(ReplayError::MalformedHeader("unknown outcome code"))?;
        reader.take(3)?;

        if event_count > MAX_REPLAY_EVENTS {
            return Err(ReplayError::CapacityExceeded { what: "events", limit: MAX_REPLAY_EVENTS });
        }
        if checkpoint_count > MAX_REPLAY_CHECKPOINTS {
            return Err(ReplayError::CapacityExceeded {
                what: "checkpoints",
                limit: MAX_REPLAY_CHECKPOINTS,
            });
        }

        // Check the size up front so a corrupt count never allocates
        let needed = HEADER_LEN + checkpoint_count * CHECKPOINT_LEN + event_count * 2;
        if bytes.len() < needed {
            return Err(ReplayError::Truncated { needed, available: bytes.len() });
        }

        let mut checkpoints: Vec<Checkpoint> = Vec::with_capacity(checkpoint_count);
        for index in 0..checkpoint_count {
            let checkpoint = Checkpoint::decode(&mut reader)?;
            if checkpoint.event_index as usize > event_count {
                return Err(ReplayError::MalformedCheckpoint {
                    index,
                    detail: "event index past the event count",
                });
            }
            if checkpoints.last().is_some_and(|last| checkpoint.frame < last.frame) {
                return Err(ReplayError::MalformedCheckpoint {
                    index,
                    detail: "frame precedes the previous checkpoint",
                });
            }
            checkpoints.push(checkpoint);
        }

        let compact = flags & FLAG_COMPACT_ANGLES != 0;
        let mut events = Vec::with_capacity(event_count);
        let mut previous = 0u32;
        for index in 0..event_count {
            let event = decode_event(&mut reader, index, previous, compact)?;
            previous = event.frame;
            events.push(event);
        }

        if reader.remaining() > 0 {
            return Err(ReplayError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            version,
            flags,
            seed,
            level_id,
            ruleset_id,
            duration,
            final_score,
            outcome,
            events,
            checkpoints,
        })
    }

    /// SHA-256 of the serialized replay, hex encoded.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.serialize()))
    }

    // =========================================================================
    // FILE I/O
    // =========================================================================

    /// Write the replay to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ReplayError> {
        let path = path.as_ref();
        let bytes = self.serialize();
        std::fs::write(path, &bytes)?;
        info!(
            "Saved replay to {} ({} bytes, {} events, {} checkpoints)",
            path.display(),
            bytes.len(),
            self.events.len(),
            self.checkpoints.len()
        );
        Ok(())
    }

    /// Read a replay from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        let replay = Self::deserialize(&bytes)?;
        info!(
            "Loaded replay {} (seed {}, {} events)",
            path.display(),
            replay.seed,
            replay.events.len()
        );
        Ok(replay)
    }
}

impl From<Replay> for Cow<'_, Replay> {
    fn from(replay: Replay) -> Self {
        Cow::Owned(replay)
    }
}

impl<'a> From<&'a Replay> for Cow<'a, Replay> {
    fn from(replay: &'a Replay) -> Self {
        Cow::Borrowed(replay)
    }
}

// =============================================================================
// ENCODING HELPERS
// =============================================================================

fn write_identifier(out: &mut Vec<u8>, id: &str) {
    let mut field = [0u8; IDENTIFIER_LEN];
    field[..id.len()].copy_from_slice(id.as_bytes());
    out.extend_from_slice(&field);
}

fn read_identifier(reader: &mut ByteReader<'_>) -> Result<String, ReplayError> {
    let field = reader.take(IDENTIFIER_LEN)?;
    let len = field.iter().position(|&b| b == 0).unwrap_or(IDENTIFIER_LEN);
    if len == IDENTIFIER_LEN {
        return Err(ReplayError::MalformedHeader("identifier is not NUL terminated"));
    }
    std::str::from_utf8(&field[..len])
        .map(str::to_owned)
        .map_err(|_| ReplayError::MalformedHeader("identifier is not UTF-8"))
}

fn encode_event(out: &mut Vec<u8>, event: &InputEvent, delta: u32, compact: bool) {
    let size = match event.kind {
        InputKind::Fire { .. } if compact => SIZE_U16,
        InputKind::Fire { .. } => SIZE_I32,
        _ => SIZE_NONE,
    };
    out.push(event.kind.type_code() << 4 | size);
    encode_varint(delta, out);
    if let InputKind::Fire { angle } = event.kind {
        if compact {
            out.extend_from_slice(&quantize_angle(angle).to_le_bytes());
        } else {
            out.extend_from_slice(&angle.to_le_bytes());
        }
    }
}

fn decode_event(
    reader: &mut ByteReader<'_>,
    index: usize,
    previous: u32,
    compact: bool,
) -> Result<InputEvent, ReplayError> {
    let malformed = |detail| ReplayError::MalformedEvent { index, detail };

    let header = reader.u8()?;
    let code = header >> 4;
    let size = header & 0b11;
    if size == 0b11 {
        return Err(malformed("reserved payload size"));
    }

    let (delta, used) = decode_varint(reader.rest())?;
    reader.take(used)?;
    let frame = previous.checked_add(delta).ok_or_else(|| malformed("frame overflows u32"))?;

    let is_fire = code == InputKind::Fire { angle: 0 }.type_code();
    let expected_size = match (is_fire, compact) {
        (true, true) => SIZE_U16,
        (true, false) => SIZE_I32,
        (false, _) => SIZE_NONE,
    };
    let angle: Fixed = match size {
        SIZE_U16 => dequantize_angle(reader.u16()?),
        SIZE_I32 => reader.i32()?,
        _ => 0,
    };
    let kind = InputKind::from_code(code, angle).ok_or_else(|| malformed("unknown event type"))?;
    if size != expected_size {
        return Err(malformed("payload size does not match event type"));
    }

    Ok(InputEvent::new(frame, kind))
}

/// Bounds-checked little-endian reader over a byte slice.
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ReplayError> {
        let end = self.pos + n;
        let slice = self.bytes.get(self.pos..end).ok_or(ReplayError::Truncated {
            needed: end,
            available: self.bytes.len(),
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ReplayError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8, ReplayError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ReplayError> {
        self.array().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Result<u32, ReplayError> {
        self.array().map(u32::from_le_bytes)
    }

    fn i32(&mut self) -> Result<i32, ReplayError> {
        self.array().map(i32::from_le_bytes)
    }

    fn u64(&mut self) -> Result<u64, ReplayError> {
        self.array().map(u64::from_le_bytes)
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{FIXED_HALF_PI, AIM_MIN};
    use crate::game::ruleset::Ruleset;

    fn sample(compact: bool) -> Replay {
        let mut replay = Replay::new(12345, "level-1", "classic", compact).unwrap();
        let state = GameState::init(12345, Ruleset::default()).unwrap();
        replay.push_checkpoint(Checkpoint::capture(&state, 0)).unwrap();
        replay.push_event(InputEvent::new(40, InputKind::RotateLeft)).unwrap();
        replay.push_event(InputEvent::fire(50, FIXED_HALF_PI)).unwrap();
        replay.push_event(InputEvent::new(50, InputKind::Switch)).unwrap();
        replay.push_event(InputEvent::new(400, InputKind::Pause)).unwrap();
        replay.push_event(InputEvent::new(401, InputKind::Unpause)).unwrap();
        replay.finalize(900, 1230, Outcome::Won);
        replay
    }

    #[test]
    fn test_header_layout() {
        let bytes = sample(true).serialize();
        assert_eq!(&bytes[0..4], b"HXRP");
        assert_eq!(bytes[4], FORMAT_VERSION);
        assert_eq!(bytes[5], FLAG_COMPACT_ANGLES);
        assert_eq!(&bytes[8..16], &12345u64.to_le_bytes());
        assert_eq!(&bytes[16..23], b"level-1");
        assert_eq!(bytes[23], 0);
        assert_eq!(&bytes[80..87], b"classic");
        assert_eq!(&bytes[144..148], &5u32.to_le_bytes());
        assert_eq!(&bytes[148..152], &1u32.to_le_bytes());
        assert_eq!(&bytes[152..156], &900u32.to_le_bytes());
        assert_eq!(&bytes[156..160], &1230u32.to_le_bytes());
        assert_eq!(bytes[160], 1);
    }

    #[test]
    fn test_event_encoding() {
        let bytes = sample(true).serialize();
        let events = &bytes[HEADER_LEN + CHECKPOINT_LEN..];
        // RotateLeft, delta 40
        assert_eq!(&events[0..2], &[0x10, 40]);
        // Fire, delta 10, compact angle: pi/2 = 16384 units
        assert_eq!(&events[2..6], &[0x31, 10, 0x00, 0x40]);
        // Switch, same frame
        assert_eq!(&events[6..8], &[0x40, 0]);
        // Pause, delta 350 = [0xDE, 0x02]
        assert_eq!(&events[8..11], &[0x50, 0xDE, 0x02]);
        assert_eq!(&events[11..13], &[0x60, 1]);
        assert_eq!(bytes.len(), HEADER_LEN + CHECKPOINT_LEN + 13);
    }

    #[test]
    fn test_round_trip() {
        for compact in [true, false] {
            let replay = sample(compact);
            let decoded = Replay::deserialize(&replay.serialize()).unwrap();
            assert_eq!(decoded, replay);
        }
    }

    #[test]
    fn test_fire_angle_precision() {
        let replay = sample(true);
        let decoded = Replay::deserialize(&replay.serialize()).unwrap();
        let InputKind::Fire { angle } = decoded.events()[1].kind else {
            panic!("expected fire");
        };
        assert_eq!(decoded.events()[1].frame, 50);
        // Within one compact unit (2pi / 65536 ~ 6.28 in Q16.16)
        assert!((angle - FIXED_HALF_PI).abs() <= 7);
    }

    #[test]
    fn test_raw_angles_exact() {
        let mut replay = Replay::new(1, "l", "r", false).unwrap();
        replay.push_event(InputEvent::fire(0, AIM_MIN + 3)).unwrap();
        let decoded = Replay::deserialize(&replay.serialize()).unwrap();
        assert_eq!(decoded.events()[0].kind, InputKind::Fire { angle: AIM_MIN + 3 });
    }

    #[test]
    fn test_truncated_header() {
        let bytes = sample(true).serialize();
        for len in [0, 3, 10, HEADER_LEN - 1] {
            assert!(matches!(
                Replay::deserialize(&bytes[..len]),
                Err(ReplayError::Truncated { .. })
            ));
        }
    }

    #[test]
    fn test_truncated_events() {
        let bytes = sample(true).serialize();
        assert!(matches!(
            Replay::deserialize(&bytes[..bytes.len() - 1]),
            Err(ReplayError::Truncated { .. })
        ));
    }

    #[test]
    fn test_bad_magic_and_version() {
        let mut bytes = sample(true).serialize();
        bytes[0] = b'X';
        assert!(matches!(Replay::deserialize(&bytes), Err(ReplayError::InvalidMagic)));

        let mut bytes = sample(true).serialize();
        bytes[4] = 9;
        assert!(matches!(
            Replay::deserialize(&bytes),
            Err(ReplayError::UnsupportedVersion { found: 9 })
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = sample(false).serialize();
        bytes.push(0);
        assert!(matches!(Replay::deserialize(&bytes), Err(ReplayError::TrailingBytes(1))));
    }

    #[test]
    fn test_malformed_event() {
        let mut bytes = sample(true).serialize();
        let first_event = HEADER_LEN + CHECKPOINT_LEN;
        bytes[first_event] = 0x13; // reserved payload size
        assert!(matches!(
            Replay::deserialize(&bytes),
            Err(ReplayError::MalformedEvent { index: 0, .. })
        ));

        let mut bytes = sample(true).serialize();
        bytes[first_event] = 0x70; // unknown type 7
        assert!(matches!(
            Replay::deserialize(&bytes),
            Err(ReplayError::MalformedEvent { index: 0, .. })
        ));

        let mut bytes = sample(true).serialize();
        bytes[first_event] = 0x11; // rotate with a payload
        assert!(Replay::deserialize(&bytes).is_err());
    }

    #[test]
    fn test_malformed_checkpoint() {
        let mut bytes = sample(true).serialize();
        // event_index field of the only checkpoint
        bytes[HEADER_LEN + 4..HEADER_LEN + 8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            Replay::deserialize(&bytes),
            Err(ReplayError::MalformedCheckpoint { index: 0, .. })
        ));
    }

    #[test]
    fn test_push_event_rejects_backwards_frames() {
        let mut replay = Replay::new(1, "l", "r", true).unwrap();
        replay.push_event(InputEvent::new(10, InputKind::Switch)).unwrap();
        assert!(matches!(
            replay.push_event(InputEvent::new(9, InputKind::Switch)),
            Err(ReplayError::NonMonotonicFrame { previous: 10, frame: 9 })
        ));
        assert_eq!(replay.event_count(), 1);
    }

    #[test]
    fn test_push_checkpoint_validation() {
        let mut replay = Replay::new(1, "l", "r", true).unwrap();
        let state = GameState::init(1, Ruleset::default()).unwrap();
        let cp = Checkpoint::capture(&state, 0);
        assert!(matches!(
            replay.push_checkpoint(Checkpoint { event_index: 1, ..cp }),
            Err(ReplayError::InvalidCheckpoint(_))
        ));
        replay.push_checkpoint(Checkpoint { frame: 10, ..cp }).unwrap();
        assert!(matches!(
            replay.push_checkpoint(Checkpoint { frame: 5, ..cp }),
            Err(ReplayError::NonMonotonicFrame { .. })
        ));
    }

    #[test]
    fn test_identifier_limits() {
        assert!(Replay::new(1, "x".repeat(63), "r", true).is_ok());
        assert!(matches!(
            Replay::new(1, "x".repeat(64), "r", true),
            Err(ReplayError::IdentifierTooLong { field: "level", len: 64 })
        ));
        assert!(matches!(
            Replay::new(1, "l", "a\0b", true),
            Err(ReplayError::IdentifierTooLong { field: "ruleset", .. })
        ));
    }

    #[test]
    fn test_checkpoint_at_or_before() {
        let mut replay = Replay::new(1, "l", "r", true).unwrap();
        let state = GameState::init(1, Ruleset::default()).unwrap();
        let cp = Checkpoint::capture(&state, 0);
        for frame in [0, 600, 1200] {
            replay.push_checkpoint(Checkpoint { frame, ..cp }).unwrap();
        }
        assert_eq!(replay.checkpoint_at_or_before(0).map(|(i, _)| i), Some(0));
        assert_eq!(replay.checkpoint_at_or_before(599).map(|(i, _)| i), Some(0));
        assert_eq!(replay.checkpoint_at_or_before(600).map(|(i, _)| i), Some(1));
        assert_eq!(replay.checkpoint_at_or_before(5000).map(|(i, _)| i), Some(2));

        let empty = Replay::new(1, "l", "r", true).unwrap();
        assert!(empty.checkpoint_at_or_before(10).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let replay = sample(true);
        let path = std::env::temp_dir().join(format!("hexpop-format-{}.hxr", std::process::id()));
        replay.save(&path).unwrap();
        let loaded = Replay::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, replay);

        assert!(matches!(Replay::load(&path), Err(ReplayError::Io(_))));
    }

    #[test]
    fn test_digest_is_stable() {
        let a = sample(true);
        let b = sample(true);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
        assert_ne!(a.digest(), sample(false).digest());
    }
}
