//! Fixed-point sample representation and block-time errors
//!
//! Samples travel between the engine and the output driver as `i32` words.
//! Only the top `sample_bits` carry signal; the remaining low "null" bits are
//! padding that is shifted out on input and shifted back in on output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage word for one interleaved sample
pub type Sample = i32;

/// Errors that abort a single block-processing call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    /// A biquad section reported a failure (its state diverged)
    #[error("Cascade failure on channel {channel}, section {section}")]
    CascadeFailure { channel: usize, section: usize },

    /// The block holds more frames than the engine was sized for
    #[error("Block of {frames} frames exceeds the maximum of {max}")]
    BlockTooLarge { frames: usize, max: usize },

    /// The block is not a whole number of interleaved frames
    #[error("Block length {len} is not a multiple of {channels} channels")]
    MisalignedBlock { len: usize, channels: usize },

    /// Input and output buffers differ in length
    #[error("Input block has {input} samples but output block has {output}")]
    LengthMismatch { input: usize, output: usize },
}

pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Bit layout of a sample inside its storage word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFormat {
    sample_bits: u32,
}

impl SampleFormat {
    /// Width of the storage word
    pub const STORAGE_BITS: u32 = Sample::BITS;
    /// Dynamic range kept clean of dither noise
    pub const DITHER_RANGE_DB: u32 = 96;

    /// 24 significant bits left-justified in a 32-bit word (the codec default)
    pub const BITS_24: SampleFormat = SampleFormat { sample_bits: 24 };
    /// 16 significant bits left-justified in a 32-bit word
    pub const BITS_16: SampleFormat = SampleFormat { sample_bits: 16 };

    /// Create a format with `sample_bits` significant bits.
    ///
    /// Returns `None` unless `2 <= sample_bits <= 32`.
    pub fn new(sample_bits: u32) -> Option<Self> {
        (2..=Self::STORAGE_BITS)
            .contains(&sample_bits)
            .then_some(Self { sample_bits })
    }

    pub fn sample_bits(&self) -> u32 {
        self.sample_bits
    }

    /// Number of low padding bits in the storage word
    pub fn null_bits(&self) -> u32 {
        Self::STORAGE_BITS - self.sample_bits
    }

    /// Largest representable magnitude, `2^(sample_bits - 1) - 1`
    pub fn max_level(&self) -> i32 {
        ((1_i64 << (self.sample_bits - 1)) - 1) as i32
    }

    /// Low bits replaced by dither noise
    ///
    /// Everything below the top `DITHER_RANGE_DB / 6` bits is noise; a
    /// 16-bit format has no bits to spare and gets zero.
    pub fn dither_bits(&self) -> u32 {
        self.sample_bits.saturating_sub(Self::DITHER_RANGE_DB / 6)
    }

    /// Strip the padding from a storage word
    #[inline]
    pub fn unpack(&self, word: Sample) -> i32 {
        word >> self.null_bits()
    }

    /// Restore the padding for a value already within `±max_level`
    #[inline]
    pub fn pack(&self, value: i32) -> Sample {
        value << self.null_bits()
    }
}

impl Default for SampleFormat {
    fn default() -> Self {
        Self::BITS_24
    }
}
