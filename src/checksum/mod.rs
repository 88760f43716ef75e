//! Checksum & Desync Module
//!
//! CRC-32 based fingerprints of game state, desync comparison and a
//! bounded per-frame checksum history.
//!
//! ## Module Structure
//!
//! - `crc`: Const-built CRC-32 table and typed state hasher
//! - `fingerprint`: Board/RNG/state/frame checksums
//! - `desync`: Component-wise comparison and desync records
//! - `ring`: Fixed-capacity frame checksum history

pub mod crc;
pub mod fingerprint;
pub mod desync;
pub mod ring;

pub use crc::{compute_checksum, crc32, Crc32Table, StateHasher, CRC32};
pub use desync::{compare_checkpoint, compare_fingerprints, DesyncComponent, DesyncInfo};
pub use fingerprint::{
    board_checksum, frame_checksum, rng_checksum, rng_state_checksum, state_checksum,
    Fingerprint,
};
pub use ring::{ChecksumEntry, ChecksumRing};
