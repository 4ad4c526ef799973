//! Domain entities and business rules

pub mod audio;
pub mod config;
pub mod diagnostics;
pub mod dsp;
pub mod mixer;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{ProcessingError, Sample, SampleFormat};
pub use config::{
    presets, BiquadDef, ChannelConfig, ChannelTarget, ConfigError, ConfigLoader, DspConfig,
    EngineSettings, FilterDef, PresetManager,
};
pub use diagnostics::{
    level_dbfs, ChannelDiagnostics, EngineReport, SectionReport, LEVEL_FLOOR_DBFS,
};
pub use dsp::{
    dither::Dither, BiquadCoeffs, BiquadSection, Cascade, FilterSpec, FilterType, Precision,
};
pub use mixer::{BlockOutcome, ChannelRuntime, Engine};
