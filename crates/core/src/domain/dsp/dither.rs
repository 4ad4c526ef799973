//! Truncation-noise substitution
//!
//! Two coupled multiply-with-carry counters (Marsaglia's MWC pair) produce a
//! uniform value in `±2^(bits-1)` that replaces the low `bits` of each output
//! sample. This is plain uniform substitution, not triangular-PDF dither.

/// Initial counter values
const SEED_U: u32 = 10;
const SEED_V: u32 = 99;

/// Stateful noise generator, advanced once per emitted sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dither {
    u: u32,
    v: u32,
    bits: u32,
}

impl Dither {
    /// Create a generator replacing the low `bits` of each sample.
    ///
    /// `bits == 0` turns `apply` into the identity.
    pub fn new(bits: u32) -> Self {
        Self {
            u: SEED_U,
            v: SEED_V,
            bits: bits.min(30),
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    fn mask(&self) -> u32 {
        (1_u32 << self.bits) - 1
    }

    /// Next noise value, `|n| < 2^bits`
    #[inline]
    pub fn next_noise(&mut self) -> i32 {
        self.v = 36_969_u32
            .wrapping_mul(self.v & 0xFFFF)
            .wrapping_add(self.v >> 16);
        self.u = 18_000_u32
            .wrapping_mul(self.u & 0xFFFF)
            .wrapping_add(self.u >> 16);

        let mask = self.mask();
        // Masked to at most 30 bits, so the cast is lossless
        let rnd = (self.u & mask) as i32;
        if rnd > ((mask + 1) >> 1) as i32 {
            -rnd
        } else {
            rnd
        }
    }

    /// Zero the low `bits` of `sample` and add the next noise value
    #[inline]
    pub fn apply(&mut self, sample: i32) -> i32 {
        if self.bits == 0 {
            return sample;
        }
        let truncated = (sample >> self.bits) << self.bits;
        truncated.saturating_add(self.next_noise())
    }

    /// Restart the sequence from the seed values
    pub fn reset(&mut self) {
        self.u = SEED_U;
        self.v = SEED_V;
    }
}
