//! CRC-32 and the state hasher built on it.
//!
//! The lookup table is computed at compile time into an immutable static.
//! Every multi-byte value is folded little-endian so checksums match across
//! platforms.

use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;

/// Reflected IEEE 802.3 polynomial.
pub const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

/// 256-entry CRC-32 lookup table.
pub struct Crc32Table([u32; 256]);

impl Crc32Table {
    /// Build the table. Usable in const context.
    pub const fn new() -> Self {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut c = i as u32;
            let mut k = 0;
            while k < 8 {
                c = if c & 1 != 0 { CRC32_POLYNOMIAL ^ (c >> 1) } else { c >> 1 };
                k += 1;
            }
            table[i] = c;
            i += 1;
        }
        Self(table)
    }

    /// Fold `bytes` into a running (pre-inverted) CRC.
    #[inline]
    pub fn update(&self, crc: u32, bytes: &[u8]) -> u32 {
        bytes.iter().fold(crc, |c, &b| {
            self.0[((c ^ b as u32) & 0xFF) as usize] ^ (c >> 8)
        })
    }

    /// Standard CRC-32 of `bytes`.
    pub fn checksum(&self, bytes: &[u8]) -> u32 {
        !self.update(!0, bytes)
    }

    /// Raw table entry.
    pub fn entry(&self, index: u8) -> u32 {
        self.0[index as usize]
    }
}

impl Default for Crc32Table {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide table.
pub static CRC32: Crc32Table = Crc32Table::new();

/// CRC-32 of a byte slice.
pub fn crc32(bytes: &[u8]) -> u32 {
    CRC32.checksum(bytes)
}

/// Incremental CRC-32 over typed values.
///
/// Order of updates is critical for determinism.
#[derive(Clone, Debug)]
pub struct StateHasher {
    crc: u32,
}

impl StateHasher {
    /// Fresh hasher.
    pub fn new() -> Self {
        Self { crc: !0 }
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.crc = CRC32.update(self.crc, bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.update_bytes(&[value]);
    }

    /// Update with a u16 value (little-endian).
    #[inline]
    pub fn update_u16(&mut self, value: u16) {
        self.update_bytes(&value.to_le_bytes());
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.update_bytes(&value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.update_bytes(&value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.update_bytes(&value.to_le_bytes());
    }

    /// Update with a Fixed value.
    #[inline]
    pub fn update_fixed(&mut self, value: Fixed) {
        self.update_i32(value);
    }

    /// Update with a FixedVec2.
    #[inline]
    pub fn update_vec2(&mut self, value: FixedVec2) {
        self.update_fixed(value.x);
        self.update_fixed(value.y);
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the checksum.
    pub fn finalize(self) -> u32 {
        !self.crc
    }
}

impl Default for StateHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `add` against a fresh hasher and finalize it.
pub fn compute_checksum<F>(add: F) -> u32
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::new();
    add(&mut hasher);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn test_table_entries() {
        assert_eq!(CRC32.entry(0), 0);
        assert_eq!(CRC32.entry(1), 0x7707_3096);
        assert_eq!(CRC32.entry(255), 0x2D02_EF8D);
    }

    #[test]
    fn test_hasher_matches_one_shot() {
        let mut hasher = StateHasher::new();
        hasher.update_bytes(b"1234");
        hasher.update_bytes(b"56789");
        assert_eq!(hasher.finalize(), 0xCBF4_3926);
    }

    #[test]
    fn test_hasher_little_endian() {
        let a = compute_checksum(|h| h.update_u32(0x0403_0201));
        assert_eq!(a, crc32(&[1, 2, 3, 4]));
        let b = compute_checksum(|h| h.update_vec2(FixedVec2::new(1, -1)));
        assert_eq!(b, crc32(&[1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]));
    }

    #[test]
    fn test_order_matters() {
        let a = compute_checksum(|h| {
            h.update_u8(1);
            h.update_u8(2);
        });
        let b = compute_checksum(|h| {
            h.update_u8(2);
            h.update_u8(1);
        });
        assert_ne!(a, b);
    }
}
