//! Built-in example configurations
//!
//! Two-channel setups for common speaker arrangements: crossovers between
//! drivers or between subwoofer and satellites, bass correction, delayed
//! effects speakers and room-curve correction.

use super::{BiquadDef, ChannelConfig, ChannelTarget, DspConfig, EngineSettings, FilterDef};
use crate::domain::dsp::{FilterSpec, FilterType, Precision};

/// A named configuration shipped with the crate
#[derive(Debug, Clone)]
pub struct BuiltinPreset {
    pub name: &'static str,
    pub description: &'static str,
    pub config: DspConfig,
}

const LEFT: [bool; 2] = [true, false];
const RIGHT: [bool; 2] = [false, true];
const BOTH: [bool; 2] = [true, true];

/// Crossover point shared by the examples
const CROSSOVER_HZ: f64 = 120.0;
const CROSSOVER_Q: f64 = 0.7;

fn channel(name: &str, sources: [bool; 2]) -> ChannelConfig {
    ChannelConfig::new(name, sources.to_vec())
}

fn filter(channel: usize, filter_type: FilterType, frequency: f64, q: f64, gain_db: f64) -> FilterDef {
    FilterDef::from(&FilterSpec::new(
        ChannelTarget::Channel(channel),
        filter_type,
        frequency,
        q,
        gain_db,
    ))
}

/// Two identical second-order sections, a fourth-order slope
fn crossover(channel: usize, filter_type: FilterType) -> [FilterDef; 2] {
    let section = filter(channel, filter_type, CROSSOVER_HZ, CROSSOVER_Q, 0.0);
    [section.clone(), section]
}

fn config(channels: Vec<ChannelConfig>, filters: Vec<FilterDef>) -> DspConfig {
    DspConfig {
        settings: EngineSettings::default(),
        channels,
        imported_biquads: Vec::new(),
        biquads: Vec::new(),
        filters,
    }
}

pub fn two_way_active_crossover() -> DspConfig {
    config(
        vec![channel("Woofer", LEFT), channel("Tweeter", LEFT)],
        [crossover(0, FilterType::LowPass), crossover(1, FilterType::HighPass)].concat(),
    )
}

pub fn subwoofer_satellite_crossover() -> DspConfig {
    config(
        vec![channel("Subwoofer", LEFT), channel("Bookshelf", LEFT)],
        [crossover(0, FilterType::LowPass), crossover(1, FilterType::HighPass)].concat(),
    )
}

pub fn subwoofer_crossover_correction() -> DspConfig {
    let correction = |index: usize| {
        let mut defs = crossover(index, FilterType::LowPass).to_vec();
        defs.push(filter(index, FilterType::PeakingEq, 35.0, 2.0, 4.0));
        defs.push(filter(index, FilterType::PeakingEq, 60.0, 5.0, -6.0));
        defs
    };

    config(
        vec![channel("Subwoofer 1", BOTH), channel("Subwoofer 2", BOTH)],
        [correction(0), correction(1)].concat(),
    )
}

pub fn effects_speakers_with_delay() -> DspConfig {
    config(
        vec![
            channel("Effects Left", LEFT).with_delay(100),
            channel("Effects Right", RIGHT).with_delay(100),
        ],
        [crossover(0, FilterType::HighPass), crossover(1, FilterType::HighPass)].concat(),
    )
}

pub fn room_curve_correction() -> DspConfig {
    let mut config = config(vec![channel("Left", LEFT), channel("Right", RIGHT)], Vec::new());
    config.imported_biquads.push(BiquadDef::new(
        ChannelTarget::All,
        [
            0.998_832_962_123_192_4,
            -1.987_815_227_290_523_2,
            0.989_240_914_301_406_6,
            1.987_815_227_290_523_2,
            -0.988_073_876_424_599,
        ],
        Precision::Double,
    ));
    config
}

/// Every built-in preset, in display order
pub fn builtin() -> Vec<BuiltinPreset> {
    vec![
        BuiltinPreset {
            name: "two-way-active-crossover",
            description: "Woofer and tweeter split from the left input at 120 Hz",
            config: two_way_active_crossover(),
        },
        BuiltinPreset {
            name: "subwoofer-satellite-crossover",
            description: "Subwoofer and bookshelf speaker split at 120 Hz",
            config: subwoofer_satellite_crossover(),
        },
        BuiltinPreset {
            name: "subwoofer-crossover-correction",
            description: "Two mono-summed subwoofers with 120 Hz low pass and bass EQ",
            config: subwoofer_crossover_correction(),
        },
        BuiltinPreset {
            name: "effects-speakers-with-delay",
            description: "High-passed effects speakers delayed by 100 ms",
            config: effects_speakers_with_delay(),
        },
        BuiltinPreset {
            name: "room-curve-correction",
            description: "Imported room-correction biquad on both channels",
            config: room_curve_correction(),
        },
    ]
}

/// Look up a built-in preset by name
pub fn find(name: &str) -> Option<BuiltinPreset> {
    builtin().into_iter().find(|preset| preset.name == name)
}
