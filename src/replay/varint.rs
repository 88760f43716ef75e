//! LEB128 variable-length integers for frame deltas.
//!
//! Seven data bits per byte, least-significant group first, high bit set
//! on every byte but the last. A `u32` takes one to five bytes.

use crate::replay::ReplayError;

/// Longest encoding of a `u32`.
pub const MAX_VARINT_LEN: usize = 5;

/// Append the encoding of `value` to `out`. Returns the bytes written.
pub fn encode_varint(mut value: u32, out: &mut Vec<u8>) -> usize {
    let mut written = 0;
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        written += 1;
        if value == 0 {
            out.push(byte);
            return written;
        }
        out.push(byte | 0x80);
    }
}

/// Decode a varint from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed. Fails with
/// `Truncated` if the input ends mid-value and `VarintOverflow` if the
/// value does not fit in 32 bits.
pub fn decode_varint(bytes: &[u8]) -> Result<(u32, usize), ReplayError> {
    let mut value: u32 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if i == MAX_VARINT_LEN - 1 && byte > 0x0F {
            // Fifth byte carries bits 28..32 only
            return Err(ReplayError::VarintOverflow);
        }
        value |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(ReplayError::Truncated { needed: bytes.len() + 1, available: bytes.len() })
}

/// Encoded length of `value` in bytes.
pub const fn varint_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0xFFF_FFFF => 4,
        _ => 5,
    }
}
