//! Engine diagnostics snapshot
//!
//! Captured on demand from a running engine for display, logging or export.
//! Never needed on the audio path.

use crate::domain::audio::SampleFormat;
use crate::domain::dsp::{FilterSpec, Precision};
use crate::domain::mixer::ChannelRuntime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest level reported, in dBFS
pub const LEVEL_FLOOR_DBFS: f64 = -144.0;

/// Convert a sample magnitude to dBFS for `format`
pub fn level_dbfs(level: u32, format: SampleFormat) -> f64 {
    if level == 0 {
        return LEVEL_FLOOR_DBFS;
    }
    let full_scale = f64::from(format.max_level());
    (20.0 * (f64::from(level) / full_scale).log10()).max(LEVEL_FLOOR_DBFS)
}

/// One resolved biquad section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionReport {
    /// `[b0, b1, b2, a1, a2]` with textbook feedback signs
    pub coeffs: [f64; 5],
    pub precision: Precision,
    /// Present when the section was designed from a parametric filter
    pub origin: Option<FilterSpec>,
}

/// Levels, counters and filters of one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDiagnostics {
    pub index: usize,
    pub name: String,
    pub sources: Vec<bool>,
    pub gain_db: f64,
    pub scaling_factor: f32,
    pub delay_ms: u32,
    pub delay_samples: usize,
    pub in_max_level: u32,
    pub out_max_level: u32,
    pub in_level_dbfs: f64,
    pub out_level_dbfs: f64,
    pub in_clip_count: u64,
    pub out_clip_count: u64,
    pub sections: Vec<SectionReport>,
}

impl ChannelDiagnostics {
    pub fn capture(channel: &ChannelRuntime, format: SampleFormat) -> Self {
        Self {
            index: channel.index(),
            name: channel.name().to_string(),
            sources: channel.sources().to_vec(),
            gain_db: channel.gain_db(),
            scaling_factor: channel.scaling_factor(),
            delay_ms: channel.delay_ms(),
            delay_samples: channel.delay_samples(),
            in_max_level: channel.in_max_level(),
            out_max_level: channel.out_max_level(),
            in_level_dbfs: level_dbfs(channel.in_max_level(), format),
            out_level_dbfs: level_dbfs(channel.out_max_level(), format),
            in_clip_count: channel.in_clip_count(),
            out_clip_count: channel.out_clip_count(),
            sections: channel
                .cascade()
                .sections()
                .iter()
                .map(|section| SectionReport {
                    coeffs: section.coeffs().textbook(),
                    precision: section.precision(),
                    origin: section.origin().cloned(),
                })
                .collect(),
        }
    }

    /// Channels are labelled A, B, C... in reports
    pub fn label(&self) -> char {
        u8::try_from(self.index)
            .ok()
            .and_then(|i| b'A'.checked_add(i))
            .map(char::from)
            .unwrap_or('?')
    }
}

/// Whole-engine report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineReport {
    pub sample_rate: u32,
    pub sample_bits: u32,
    pub block_frames: usize,
    pub block_latency_ms: f64,
    pub dither: bool,
    pub channels: Vec<ChannelDiagnostics>,
}

impl EngineReport {
    pub fn any_clipping(&self) -> bool {
        self.channels
            .iter()
            .any(|c| c.in_clip_count > 0 || c.out_clip_count > 0)
    }

    /// Compact JSON, one report per line
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for EngineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sampling rate = {} Hz", self.sample_rate)?;
        writeln!(f, "Sampling bits = {}", self.sample_bits)?;
        writeln!(
            f,
            "Block = {} frames ({:.3} ms)",
            self.block_frames, self.block_latency_ms
        )?;
        writeln!(f, "Dither = {}", if self.dither { "ON" } else { "OFF" })?;

        for channel in &self.channels {
            writeln!(f)?;
            write!(f, "{channel}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ChannelDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Channel {}: {}", self.label(), self.name)?;
        for (input, selected) in self.sources.iter().enumerate() {
            writeln!(f, "  Input {} = {}", input, u8::from(*selected))?;
        }
        writeln!(f, "  Gain = {:.2} dB", self.gain_db)?;
        writeln!(f, "  Scaling factor = {:.6}", self.scaling_factor)?;
        writeln!(f, "  Delay = {} ms ({} samples)", self.delay_ms, self.delay_samples)?;
        writeln!(
            f,
            "  Input level max = {} ({:.1} dBFS)",
            self.in_max_level, self.in_level_dbfs
        )?;
        writeln!(
            f,
            "  Output level max = {} ({:.1} dBFS)",
            self.out_max_level, self.out_level_dbfs
        )?;
        writeln!(f, "  Input clipping count = {}", self.in_clip_count)?;
        writeln!(f, "  Output clipping count = {}", self.out_clip_count)?;
        writeln!(f, "  Filter count = {}", self.sections.len())?;

        for (i, section) in self.sections.iter().enumerate() {
            let [b0, b1, b2, a1, a2] = section.coeffs;
            writeln!(
                f,
                "  Filter {} coeffs = {:.14e} {:.14e} {:.14e} {:.14e} {:.14e} ({})",
                i + 1,
                b0,
                b1,
                b2,
                a1,
                a2,
                section.precision.label()
            )?;
            if let Some(spec) = &section.origin {
                writeln!(
                    f,
                    "    {}: Frequency={:.1}  Q={}  Gain={:.1}",
                    spec.filter_type, spec.frequency, spec.q, spec.gain_db
                )?;
            }
        }
        Ok(())
    }
}
