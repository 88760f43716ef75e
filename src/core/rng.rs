//! Deterministic Random Number Generator
//!
//! Uses xoshiro128** for fast, high-quality, deterministic randomness.
//! Given the same seed, produces identical sequence on all platforms.
//! The four state words are what checkpoints store and compare.

use serde::{Deserialize, Serialize};

/// Deterministic PRNG using the xoshiro128** algorithm.
///
/// # Determinism Guarantee
///
/// Given the same seed, this RNG will produce the exact same sequence
/// of random numbers on any platform.
///
/// # Example
///
/// ```
/// use hexpop::core::rng::DeterministicRng;
///
/// let mut rng = DeterministicRng::new(42);
/// assert_eq!(rng.next_u32(), 1776835114); // Always the same!
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u32; 4],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let a = splitmix64(&mut s);
        let b = splitmix64(&mut s);

        Self::from_state([a as u32, (a >> 32) as u32, b as u32, (b >> 32) as u32])
    }

    /// Rebuild an RNG from saved state words.
    pub fn from_state(state: [u32; 4]) -> Self {
        // Ensure state is never all zeros
        if state == [0; 4] {
            Self { state: [1, 1, 1, 1] }
        } else {
            Self { state }
        }
    }

    /// Generate the next 32-bit random value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let s = &mut self.state;
        let result = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = s[1] << 9;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(11);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // Simple modulo - slight bias for very large max, but acceptable
        self.next_u32() % max
    }

    /// True with probability `permille / 1000`.
    ///
    /// Always draws exactly one value so call sites consume the stream
    /// identically whatever the outcome.
    #[inline]
    pub fn chance_permille(&mut self, permille: u16) -> bool {
        self.next_int(1000) < permille as u32
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int(slice.len() as u32) as usize;
            slice.get(idx)
        }
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> [u32; 4] {
        self.state
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        // Same seed must produce same sequence
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);
        assert_ne!(rng1.state(), rng2.state());
        assert_ne!(rng1.next_u32(), rng2.next_u32());
    }

    #[test]
    fn test_rng_known_values() {
        // These values must never change!
        // If they do, existing replays will break.
        let mut rng = DeterministicRng::new(42);
        assert_eq!(rng.state(), [803958421, 3184996902, 2993090819, 686809907]);
        assert_eq!(rng.next_u32(), 1776835114);
        assert_eq!(rng.next_u32(), 4165204688);
        assert_eq!(rng.next_u32(), 17111135);
    }

    #[test]
    fn test_zero_state_guard() {
        let rng = DeterministicRng::from_state([0; 4]);
        assert_ne!(rng.state(), [0; 4]);
    }

    #[test]
    fn test_next_int() {
        let mut rng = DeterministicRng::new(1234);

        for _ in 0..1000 {
            assert!(rng.next_int(100) < 100);
        }

        assert_eq!(rng.next_int(0), 0);
        assert_eq!(rng.next_int(1), 0);
    }

    #[test]
    fn test_chance_consumes_one_draw() {
        let mut a = DeterministicRng::new(77);
        let mut b = DeterministicRng::new(77);
        assert!(!a.chance_permille(0));
        assert!(b.chance_permille(1000));
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_choose() {
        let mut rng = DeterministicRng::new(9);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
        let items = [1, 2, 3];
        assert!(items.contains(rng.choose(&items).unwrap_or(&0)));
    }

    #[test]
    fn test_state_checkpoint() {
        let mut rng = DeterministicRng::new(5555);

        for _ in 0..50 {
            rng.next_u32();
        }

        let saved_state = rng.state();
        let next_values: Vec<u32> = (0..10).map(|_| rng.next_u32()).collect();

        let mut rng = DeterministicRng::from_state(saved_state);

        for expected in next_values {
            assert_eq!(rng.next_u32(), expected);
        }
    }
}
