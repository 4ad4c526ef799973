//! Biquad filter design and cascade execution
//!
//! This module provides:
//! - Closed-form coefficient design for the eight parametric filter types
//! - `BiquadSection`: one second-order stage executed in single or double precision
//! - `Cascade`: a bounded, ordered chain of sections applied block by block
//! - Closed-form magnitude and complex frequency response
//!
//! Coefficients are stored normalized (`a0 == 1`) with `a1` and `a2` already
//! negated, so the recurrence feeds back `+a1*y` and `+a2*y`.

pub mod dither;

use crate::domain::config::{ChannelTarget, ConfigError};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// FILTER SPECIFICATION
// ============================================================================

/// Parametric filter shapes supported by the designer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
    AllPass,
    PeakingEq,
    LowShelf,
    HighShelf,
}

impl FilterType {
    pub const ALL: [FilterType; 8] = [
        FilterType::LowPass,
        FilterType::HighPass,
        FilterType::BandPass,
        FilterType::Notch,
        FilterType::AllPass,
        FilterType::PeakingEq,
        FilterType::LowShelf,
        FilterType::HighShelf,
    ];

    /// Resolve a numeric filter code (0 = low pass ... 7 = high shelf)
    pub fn from_code(code: i64) -> Result<Self, ConfigError> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| ConfigError::UnknownFilterType(code.to_string()))
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Human-readable name for reports
    pub fn label(&self) -> &'static str {
        match self {
            FilterType::LowPass => "Low Pass",
            FilterType::HighPass => "High Pass",
            FilterType::BandPass => "Band Pass",
            FilterType::Notch => "Notch",
            FilterType::AllPass => "All Pass",
            FilterType::PeakingEq => "Peak EQ",
            FilterType::LowShelf => "Low Shelf",
            FilterType::HighShelf => "High Shelf",
        }
    }
}

impl FromStr for FilterType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "low_pass" | "lowpass" | "lpf" => Ok(FilterType::LowPass),
            "high_pass" | "highpass" | "hpf" => Ok(FilterType::HighPass),
            "band_pass" | "bandpass" | "bpf" => Ok(FilterType::BandPass),
            "notch" => Ok(FilterType::Notch),
            "all_pass" | "allpass" | "apf" => Ok(FilterType::AllPass),
            "peaking_eq" | "peak_eq" | "peaking" | "peq" => Ok(FilterType::PeakingEq),
            "low_shelf" | "lowshelf" => Ok(FilterType::LowShelf),
            "high_shelf" | "highshelf" => Ok(FilterType::HighShelf),
            _ => Err(ConfigError::UnknownFilterType(s.to_string())),
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Arithmetic used when a section runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    #[default]
    #[serde(alias = "float", alias = "flt")]
    Single,
    #[serde(alias = "dbl")]
    Double,
}

impl Precision {
    pub fn label(&self) -> &'static str {
        match self {
            Precision::Single => "FLT",
            Precision::Double => "DBL",
        }
    }
}

/// A parametric filter definition, resolved to coefficients at load time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub channel: ChannelTarget,
    pub filter_type: FilterType,
    /// Center or corner frequency in Hz
    pub frequency: f64,
    pub q: f64,
    /// Boost/cut in dB (peaking and shelving types only)
    #[serde(default)]
    pub gain_db: f64,
    #[serde(default)]
    pub precision: Precision,
}

impl FilterSpec {
    pub fn new(
        channel: ChannelTarget,
        filter_type: FilterType,
        frequency: f64,
        q: f64,
        gain_db: f64,
    ) -> Self {
        Self {
            channel,
            filter_type,
            frequency,
            q,
            gain_db,
            precision: Precision::Single,
        }
    }

    #[must_use]
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Design the normalized coefficients for this filter
    pub fn design(&self, sample_rate: u32) -> Result<BiquadCoeffs, ConfigError> {
        BiquadCoeffs::design(self, sample_rate)
    }
}

// ============================================================================
// BIQUAD COEFFICIENTS
// ============================================================================

/// Normalized biquad coefficients
///
/// `a0` is implicitly 1. `a1` and `a2` hold the negated textbook values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Intermediate terms shared by every design equation
struct Prototype {
    cos_w0: f64,
    alpha: f64,
    /// Linear amplitude, `10^(gain/40)`
    a: f64,
}

impl Prototype {
    fn new(sample_rate: f64, freq: f64, q: f64, gain_db: f64) -> Self {
        let w0 = 2.0 * PI * freq / sample_rate;
        Self {
            cos_w0: w0.cos(),
            alpha: w0.sin() / (2.0 * q),
            a: 10.0_f64.powf(gain_db / 40.0),
        }
    }
}

impl BiquadCoeffs {
    /// Unity gain, no filtering
    pub const IDENTITY: BiquadCoeffs = BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Build from `[b0, b1, b2, a1, a2]` in stored (negated feedback) form
    pub fn from_array(coeffs: [f64; 5]) -> Self {
        let [b0, b1, b2, a1, a2] = coeffs;
        Self { b0, b1, b2, a1, a2 }
    }

    pub fn to_array(&self) -> [f64; 5] {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
    }

    /// Single-precision copy used by `Precision::Single` sections
    pub fn to_f32(&self) -> [f32; 5] {
        self.to_array().map(|c| c as f32)
    }

    /// Coefficients with textbook feedback signs, for display
    pub fn textbook(&self) -> [f64; 5] {
        [self.b0, self.b1, self.b2, -self.a1, -self.a2]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|c| c.is_finite())
    }

    fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    #[must_use]
    pub fn low_pass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let Prototype { cos_w0, alpha, .. } = Prototype::new(sample_rate, freq, q, 0.0);
        Self::normalize(
            (1.0 - cos_w0) / 2.0,
            1.0 - cos_w0,
            (1.0 - cos_w0) / 2.0,
            1.0 + alpha,
            2.0 * cos_w0,
            -(1.0 - alpha),
        )
    }

    #[must_use]
    pub fn high_pass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let Prototype { cos_w0, alpha, .. } = Prototype::new(sample_rate, freq, q, 0.0);
        Self::normalize(
            (1.0 + cos_w0) / 2.0,
            -(1.0 + cos_w0),
            (1.0 + cos_w0) / 2.0,
            1.0 + alpha,
            2.0 * cos_w0,
            -(1.0 - alpha),
        )
    }

    /// Constant 0 dB peak gain band pass
    #[must_use]
    pub fn band_pass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let Prototype { cos_w0, alpha, .. } = Prototype::new(sample_rate, freq, q, 0.0);
        Self::normalize(
            alpha,
            0.0,
            -alpha,
            1.0 + alpha,
            2.0 * cos_w0,
            -(1.0 - alpha),
        )
    }

    #[must_use]
    pub fn notch(sample_rate: f64, freq: f64, q: f64) -> Self {
        let Prototype { cos_w0, alpha, .. } = Prototype::new(sample_rate, freq, q, 0.0);
        Self::normalize(
            1.0,
            -2.0 * cos_w0,
            1.0,
            1.0 + alpha,
            2.0 * cos_w0,
            -(1.0 - alpha),
        )
    }

    #[must_use]
    pub fn all_pass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let Prototype { cos_w0, alpha, .. } = Prototype::new(sample_rate, freq, q, 0.0);
        Self::normalize(
            1.0 - alpha,
            -2.0 * cos_w0,
            1.0 + alpha,
            1.0 + alpha,
            2.0 * cos_w0,
            -(1.0 - alpha),
        )
    }

    /// Boosts or cuts frequencies around a center frequency
    #[must_use]
    pub fn peaking(sample_rate: f64, freq: f64, q: f64, gain_db: f64) -> Self {
        let Prototype { cos_w0, alpha, a } = Prototype::new(sample_rate, freq, q, gain_db);
        Self::normalize(
            1.0 + alpha * a,
            -2.0 * cos_w0,
            1.0 - alpha * a,
            1.0 + alpha / a,
            2.0 * cos_w0,
            -(1.0 - alpha / a),
        )
    }

    /// Boosts or cuts frequencies below the corner frequency
    #[must_use]
    pub fn low_shelf(sample_rate: f64, freq: f64, q: f64, gain_db: f64) -> Self {
        let Prototype { cos_w0, alpha, a } = Prototype::new(sample_rate, freq, q, gain_db);
        let sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::normalize(
            a * ((a + 1.0) - (a - 1.0) * cos_w0 + sqrt_a_alpha),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
            a * ((a + 1.0) - (a - 1.0) * cos_w0 - sqrt_a_alpha),
            (a + 1.0) + (a - 1.0) * cos_w0 + sqrt_a_alpha,
            2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
            -((a + 1.0) + (a - 1.0) * cos_w0 - sqrt_a_alpha),
        )
    }

    /// Boosts or cuts frequencies above the corner frequency
    #[must_use]
    pub fn high_shelf(sample_rate: f64, freq: f64, q: f64, gain_db: f64) -> Self {
        let Prototype { cos_w0, alpha, a } = Prototype::new(sample_rate, freq, q, gain_db);
        let sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::normalize(
            a * ((a + 1.0) + (a - 1.0) * cos_w0 + sqrt_a_alpha),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
            a * ((a + 1.0) + (a - 1.0) * cos_w0 - sqrt_a_alpha),
            (a + 1.0) - (a - 1.0) * cos_w0 + sqrt_a_alpha,
            -2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
            -((a + 1.0) - (a - 1.0) * cos_w0 - sqrt_a_alpha),
        )
    }

    /// Design the coefficients for a parametric filter
    ///
    /// The frequency is not checked against Nyquist. A negative Q, a
    /// frequency that is not positive and finite, or anything else that
    /// produces non-finite coefficients (zero Q, zero sample rate) is rejected.
    pub fn design(spec: &FilterSpec, sample_rate: u32) -> Result<Self, ConfigError> {
        let fs = f64::from(sample_rate);
        let (freq, q, gain) = (spec.frequency, spec.q, spec.gain_db);
        let degenerate = || ConfigError::DegenerateFilter {
            filter_type: spec.filter_type,
            frequency: freq,
            q,
        };

        // A negative Q flips the sign of alpha and puts the poles outside the unit circle
        if q.is_nan() || q < 0.0 || !freq.is_finite() || freq <= 0.0 {
            return Err(degenerate());
        }

        let coeffs = match spec.filter_type {
            FilterType::LowPass => Self::low_pass(fs, freq, q),
            FilterType::HighPass => Self::high_pass(fs, freq, q),
            FilterType::BandPass => Self::band_pass(fs, freq, q),
            FilterType::Notch => Self::notch(fs, freq, q),
            FilterType::AllPass => Self::all_pass(fs, freq, q),
            FilterType::PeakingEq => Self::peaking(fs, freq, q, gain),
            FilterType::LowShelf => Self::low_shelf(fs, freq, q, gain),
            FilterType::HighShelf => Self::high_shelf(fs, freq, q, gain),
        };

        if !coeffs.is_finite() {
            return Err(degenerate());
        }

        Ok(coeffs)
    }

    /// Magnitude response in dB at `freq`
    ///
    /// Closed-form evaluation of `|H(e^jw)|^2` with `phi = 4 sin^2(w/2)`.
    pub fn magnitude_db(&self, freq: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq / sample_rate;
        let phi = 4.0 * (w / 2.0).sin().powi(2);
        let Self { b0, b1, b2, a1, a2 } = *self;

        let numerator =
            (b0 + b1 + b2).powi(2) + (b0 * b2 * phi - (b1 * (b0 + b2) + 4.0 * b0 * b2)) * phi;
        let denominator =
            (1.0 - a1 - a2).powi(2) + (-a2 * phi - (-a1 * (1.0 - a2) - 4.0 * a2)) * phi;

        10.0 * numerator.log10() - 10.0 * denominator.log10()
    }

    /// Complex transfer function `H(e^jw)` at `freq`
    pub fn response(&self, freq: f64, sample_rate: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -2.0 * PI * freq / sample_rate);
        let z2 = z1 * z1;
        let re = |x: f64| Complex64::new(x, 0.0);

        (re(self.b0) + re(self.b1) * z1 + re(self.b2) * z2)
            / (re(1.0) - re(self.a1) * z1 - re(self.a2) * z2)
    }
}

// ============================================================================
// BIQUAD SECTION
// ============================================================================

/// A section's state left the finite range during a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("biquad state diverged")]
pub struct Diverged;

/// One stage of a cascade
///
/// Holds both coefficient widths so the precision can be chosen per section.
/// The two-element state is always carried as `f32` between samples and
/// blocks and is only cleared by building a new section.
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadSection {
    coeffs: BiquadCoeffs,
    coeffs_f32: [f32; 5],
    precision: Precision,
    state: [f32; 2],
    origin: Option<FilterSpec>,
}

impl BiquadSection {
    /// Create a section from explicit coefficients
    pub fn new(coeffs: BiquadCoeffs, precision: Precision) -> Self {
        Self {
            coeffs,
            coeffs_f32: coeffs.to_f32(),
            precision,
            state: [0.0; 2],
            origin: None,
        }
    }

    /// Design a section from a parametric specification
    pub fn from_spec(spec: &FilterSpec, sample_rate: u32) -> Result<Self, ConfigError> {
        let coeffs = spec.design(sample_rate)?;
        Ok(Self {
            origin: Some(spec.clone()),
            ..Self::new(coeffs, spec.precision)
        })
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn state(&self) -> [f32; 2] {
        self.state
    }

    /// The parametric specification this section was designed from, if any
    pub fn origin(&self) -> Option<&FilterSpec> {
        self.origin.as_ref()
    }

    /// Filter a block in place
    pub fn apply(&mut self, block: &mut [f32]) -> Result<(), Diverged> {
        match self.precision {
            Precision::Single => self.apply_single(block),
            Precision::Double => self.apply_double(block),
        }

        if self.state.iter().all(|w| w.is_finite()) {
            Ok(())
        } else {
            Err(Diverged)
        }
    }

    #[inline]
    fn apply_single(&mut self, block: &mut [f32]) {
        let [b0, b1, b2, a1, a2] = self.coeffs_f32;
        let [mut z1, mut z2] = self.state;

        for sample in block.iter_mut() {
            let x = *sample;
            let y = b0 * x + z1;
            z1 = b1 * x + a1 * y + z2;
            z2 = b2 * x + a2 * y;
            *sample = y;
        }

        self.state = [z1, z2];
    }

    #[inline]
    fn apply_double(&mut self, block: &mut [f32]) {
        let [b0, b1, b2, a1, a2] = self.coeffs.to_array();
        let [mut z1, mut z2] = self.state;

        for sample in block.iter_mut() {
            let x = f64::from(*sample);
            let y = b0 * x + f64::from(z1);
            z1 = (b1 * x + a1 * y + f64::from(z2)) as f32;
            z2 = (b2 * x + a2 * y) as f32;
            *sample = y as f32;
        }

        self.state = [z1, z2];
    }
}

// ============================================================================
// CASCADE
// ============================================================================

/// A section failed while running a cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("section {section} of the cascade diverged")]
pub struct SectionFault {
    pub section: usize,
}

/// The cascade already holds its maximum number of sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cascade is full ({capacity} sections)")]
pub struct CascadeFull {
    pub capacity: usize,
}

/// Ordered, bounded chain of biquad sections
///
/// Each section consumes the whole block before the next one runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    sections: Vec<BiquadSection>,
    capacity: usize,
}

impl Cascade {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sections: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a section, refusing once `capacity` sections are held
    pub fn try_push(&mut self, section: BiquadSection) -> Result<(), CascadeFull> {
        if self.sections.len() >= self.capacity {
            return Err(CascadeFull {
                capacity: self.capacity,
            });
        }
        self.sections.push(section);
        Ok(())
    }

    /// Run every section over the block in order (no-op when empty)
    pub fn apply(&mut self, block: &mut [f32]) -> Result<(), SectionFault> {
        for (section, stage) in self.sections.iter_mut().enumerate() {
            stage.apply(block).map_err(|_| SectionFault { section })?;
        }
        Ok(())
    }

    pub fn sections(&self) -> &[BiquadSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Summed magnitude response of all sections in dB
    pub fn magnitude_db(&self, freq: f64, sample_rate: f64) -> f64 {
        self.sections
            .iter()
            .map(|s| s.coeffs().magnitude_db(freq, sample_rate))
            .sum()
    }

    /// Product of the sections' complex responses
    pub fn response(&self, freq: f64, sample_rate: f64) -> Complex64 {
        self.sections
            .iter()
            .map(|s| s.coeffs().response(freq, sample_rate))
            .fold(Complex64::new(1.0, 0.0), |acc, h| acc * h)
    }
}

// ============================================================================
// TESTS
// ============================================================================
