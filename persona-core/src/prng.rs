//! Keyed deterministic PRNG shared by selection and noise.
//!
//! Every value is a pure function of `(key, index)`, so the host process and
//! the script sandbox reproduce the same sequence without sharing state.

/// SplitMix64 increment.
const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic hash mixing (SplitMix64 finalizer).
///
/// `mix64(0, 0)` is the first output of SplitMix64 seeded with zero.
#[inline]
pub fn mix64(seed: u64, index: u64) -> u64 {
    let mut z = seed.wrapping_add(index.wrapping_add(1).wrapping_mul(GOLDEN_GAMMA));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Counter-mode stream over [`mix64`].
#[derive(Debug, Clone)]
pub struct NoiseStream {
    key: u64,
    counter: u64,
}

impl NoiseStream {
    /// Stream keyed by a sub-seed and a call-site discriminator.
    pub fn new(sub_seed: u64, discriminator: u64) -> Self {
        Self {
            key: mix64(sub_seed, discriminator),
            counter: 0,
        }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let v = mix64(self.key, self.counter);
        self.counter = self.counter.wrapping_add(1);
        v
    }

    /// Uniform in `[0, 1)` with 53 bits of precision.
    #[inline]
    pub fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform-ish in `[0, bound)`. `bound` must be non-zero.
    #[inline]
    pub fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}
