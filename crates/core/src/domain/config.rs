//! Configuration management for speakerdsp
//!
//! This module provides:
//! - Engine settings (sample rate, channel count, capacity limits)
//! - Channel and filter definitions with TOML serialization
//! - `ConfigLoader`, which validates definitions and builds an `Engine`
//! - Preset system backed by a directory of TOML files

pub mod presets;

use crate::domain::audio::SampleFormat;
use crate::domain::dsp::{BiquadCoeffs, BiquadSection, FilterSpec, FilterType, Precision};
use crate::domain::mixer::{ChannelRuntime, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading or validating a configuration
///
/// Any of these leaves the engine unbuilt.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid gain {gain_db} dB for channel '{channel}' (limit ±{max} dB)")]
    InvalidGain {
        channel: String,
        gain_db: f64,
        max: f64,
    },

    #[error("Invalid delay {delay_ms} ms for channel '{channel}' (0 or {min}..={max} ms)")]
    InvalidDelay {
        channel: String,
        delay_ms: u32,
        min: u32,
        max: u32,
    },

    #[error("Maximum of {max} filters exceeded for channel '{channel}'")]
    TooManyFilters { channel: String, max: usize },

    #[error("Unknown filter type: {0}")]
    UnknownFilterType(String),

    #[error("{filter_type} at {frequency} Hz with Q={q} is not a stable filter")]
    DegenerateFilter {
        filter_type: FilterType,
        frequency: f64,
        q: f64,
    },

    #[error("Unable to allocate buffers for channel '{channel}'")]
    AllocationFailure { channel: String },

    #[error("Invalid engine settings: {0}")]
    InvalidSettings(String),

    #[error("Expected {expected} channel definitions, found {found}")]
    ChannelCount { expected: usize, found: usize },

    #[error("Channel '{channel}' selects from {found} sources, expected {expected}")]
    SourceSelection {
        channel: String,
        expected: usize,
        found: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("Preset name '{0}' belongs to a built-in preset")]
    ReservedPresetName(String),
}

// ============================================================================
// ENGINE SETTINGS
// ============================================================================

/// Engine-wide parameters and capacity limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub sample_rate: u32,
    /// Interleaved channels per frame (inputs and outputs alike)
    pub channels: usize,
    /// Largest block accepted by `Engine::process_block`, in frames
    pub max_block_frames: usize,
    /// Biquad sections per channel
    pub max_filters: usize,
    pub max_gain_db: f64,
    pub max_delay_ms: u32,
    /// Significant bits per sample, left-justified in an `i32` word
    pub sample_bits: u32,
    pub dither: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            max_block_frames: 96,
            max_filters: 20,
            max_gain_db: 24.0,
            max_delay_ms: 250,
            sample_bits: 24,
            dither: false,
        }
    }
}

impl EngineSettings {
    /// Shortest non-zero delay: one block plus a millisecond of headroom
    pub fn min_delay_ms(&self) -> u32 {
        let block_ms = self.max_block_frames as u64 * 1000 / u64::from(self.sample_rate.max(1));
        u32::try_from(block_ms + 1).unwrap_or(u32::MAX)
    }

    /// Ring buffer capacity needed for the longest allowed delay
    pub fn max_delay_samples(&self) -> usize {
        self.delay_samples(self.max_delay_ms) + 1
    }

    /// Delay in whole samples for `delay_ms` (truncating)
    pub fn delay_samples(&self, delay_ms: u32) -> usize {
        (u64::from(self.sample_rate) * u64::from(delay_ms) / 1000) as usize
    }

    /// Real-time budget for one full block
    pub fn block_period(&self) -> Duration {
        Duration::from_secs_f64(self.max_block_frames as f64 / f64::from(self.sample_rate.max(1)))
    }

    pub fn sample_format(&self) -> Result<SampleFormat> {
        SampleFormat::new(self.sample_bits).ok_or_else(|| {
            ConfigError::InvalidSettings(format!(
                "sample_bits must be within 2..=32, got {}",
                self.sample_bits
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSettings(
                "sample_rate must be non-zero".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(ConfigError::InvalidSettings(
                "at least one channel is required".to_string(),
            ));
        }
        if self.max_block_frames == 0 {
            return Err(ConfigError::InvalidSettings(
                "max_block_frames must be non-zero".to_string(),
            ));
        }
        if !self.max_gain_db.is_finite() || self.max_gain_db < 0.0 {
            return Err(ConfigError::InvalidSettings(format!(
                "max_gain_db must be a non-negative number, got {}",
                self.max_gain_db
            )));
        }
        self.sample_format()?;
        Ok(())
    }
}

// ============================================================================
// CHANNEL TARGET
// ============================================================================

/// Which channel(s) a filter definition applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "TargetRepr", into = "TargetRepr")]
pub enum ChannelTarget {
    #[default]
    All,
    Channel(usize),
}

impl ChannelTarget {
    /// Numeric sentinel for "every channel"
    pub const ALL_CHANNELS: i64 = -1;

    pub fn matches(&self, channel: usize) -> bool {
        match self {
            ChannelTarget::All => true,
            ChannelTarget::Channel(index) => *index == channel,
        }
    }
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelTarget::All => f.write_str("all"),
            ChannelTarget::Channel(index) => write!(f, "{index}"),
        }
    }
}

/// File form: a channel index, `-1`, or `"all"`
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TargetRepr {
    Index(i64),
    Name(String),
}

impl TryFrom<TargetRepr> for ChannelTarget {
    type Error = String;

    fn try_from(repr: TargetRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            TargetRepr::Index(Self::ALL_CHANNELS) => Ok(ChannelTarget::All),
            TargetRepr::Index(index) => usize::try_from(index)
                .map(ChannelTarget::Channel)
                .map_err(|_| format!("invalid channel index {index}")),
            TargetRepr::Name(name) if name.eq_ignore_ascii_case("all") => Ok(ChannelTarget::All),
            TargetRepr::Name(name) => Err(format!("invalid channel target '{name}'")),
        }
    }
}

impl From<ChannelTarget> for TargetRepr {
    fn from(target: ChannelTarget) -> Self {
        match target {
            ChannelTarget::All => TargetRepr::Name("all".to_string()),
            ChannelTarget::Channel(index) => TargetRepr::Index(index as i64),
        }
    }
}

// ============================================================================
// CHANNEL AND FILTER DEFINITIONS
// ============================================================================

/// Output channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    /// One flag per input channel; selected inputs are averaged
    pub sources: Vec<bool>,
    #[serde(default)]
    pub gain_db: f64,
    /// 0 disables the delay line
    #[serde(default)]
    pub delay_ms: u32,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>, sources: Vec<bool>) -> Self {
        Self {
            name: name.into(),
            sources,
            gain_db: 0.0,
            delay_ms: 0,
        }
    }

    #[must_use]
    pub fn with_gain(mut self, gain_db: f64) -> Self {
        self.gain_db = gain_db;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Check gain, delay and source selection against the engine limits
    pub fn validate(&self, settings: &EngineSettings) -> Result<()> {
        if self.sources.len() != settings.channels {
            return Err(ConfigError::SourceSelection {
                channel: self.name.clone(),
                expected: settings.channels,
                found: self.sources.len(),
            });
        }

        if !(-settings.max_gain_db..=settings.max_gain_db).contains(&self.gain_db) {
            return Err(ConfigError::InvalidGain {
                channel: self.name.clone(),
                gain_db: self.gain_db,
                max: settings.max_gain_db,
            });
        }

        let (min, max) = (settings.min_delay_ms(), settings.max_delay_ms);
        if self.delay_ms != 0 && !(min..=max).contains(&self.delay_ms) {
            return Err(ConfigError::InvalidDelay {
                channel: self.name.clone(),
                delay_ms: self.delay_ms,
                min,
                max,
            });
        }

        Ok(())
    }
}

/// A biquad given directly by its coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiquadDef {
    pub channel: ChannelTarget,
    /// `[b0, b1, b2, a1, a2]` with `a1`/`a2` already negated
    pub coeffs: [f64; 5],
    #[serde(default)]
    pub precision: Precision,
}

impl BiquadDef {
    pub fn new(channel: ChannelTarget, coeffs: [f64; 5], precision: Precision) -> Self {
        Self {
            channel,
            coeffs,
            precision,
        }
    }

    pub fn section(&self) -> BiquadSection {
        BiquadSection::new(BiquadCoeffs::from_array(self.coeffs), self.precision)
    }
}

/// Filter type as written in a file: a name or a numeric code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterTypeRepr {
    Known(FilterType),
    Code(i64),
    Other(String),
}

/// A parametric filter as written in a file
///
/// Resolved into a `FilterSpec` before loading; unknown types fail there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDef {
    pub channel: ChannelTarget,
    pub filter_type: FilterTypeRepr,
    pub frequency: f64,
    pub q: f64,
    #[serde(default)]
    pub gain_db: f64,
    #[serde(default)]
    pub precision: Precision,
}

impl FilterDef {
    pub fn to_spec(&self) -> Result<FilterSpec> {
        let filter_type = match &self.filter_type {
            FilterTypeRepr::Known(filter_type) => *filter_type,
            FilterTypeRepr::Code(code) => FilterType::from_code(*code)?,
            FilterTypeRepr::Other(name) => name.parse()?,
        };

        Ok(FilterSpec::new(
            self.channel,
            filter_type,
            self.frequency,
            self.q,
            self.gain_db,
        )
        .with_precision(self.precision))
    }
}

impl From<&FilterSpec> for FilterDef {
    fn from(spec: &FilterSpec) -> Self {
        Self {
            channel: spec.channel,
            filter_type: FilterTypeRepr::Known(spec.filter_type),
            frequency: spec.frequency,
            q: spec.q,
            gain_db: spec.gain_db,
            precision: spec.precision,
        }
    }
}

// ============================================================================
// CONFIG LOADER
// ============================================================================

/// Builds channel runtimes from definitions in a fixed precedence:
/// imported biquads, then explicit biquads, then parametric filters.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    settings: EngineSettings,
}

impl ConfigLoader {
    pub fn new(settings: EngineSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Validate every channel and build the engine
    ///
    /// The first failure aborts the whole load; no partial engine is returned.
    #[instrument(skip_all, fields(channels = channels.len()))]
    pub fn initialize(
        &self,
        channels: &[ChannelConfig],
        imported: &[BiquadDef],
        explicit: &[BiquadDef],
        filters: &[FilterSpec],
    ) -> Result<Engine> {
        if channels.len() != self.settings.channels {
            error!(
                expected = self.settings.channels,
                found = channels.len(),
                "Channel definition count mismatch"
            );
            return Err(ConfigError::ChannelCount {
                expected: self.settings.channels,
                found: channels.len(),
            });
        }

        let runtimes = channels
            .iter()
            .enumerate()
            .map(|(index, config)| {
                self.build_channel(index, config, imported, explicit, filters)
                    .map_err(|e| {
                        error!(channel = %config.name, error = %e, "Channel setup failed");
                        e
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Engine::new(self.settings.clone(), runtimes)
    }

    fn build_channel(
        &self,
        index: usize,
        config: &ChannelConfig,
        imported: &[BiquadDef],
        explicit: &[BiquadDef],
        filters: &[FilterSpec],
    ) -> Result<ChannelRuntime> {
        let mut runtime = ChannelRuntime::new(index, config, &self.settings)?;

        for def in imported
            .iter()
            .chain(explicit)
            .filter(|def| def.channel.matches(index))
        {
            runtime.push_section(def.section())?;
            debug!(channel = index, coeffs = ?def.coeffs, "Biquad section added");
        }

        for spec in filters.iter().filter(|spec| spec.channel.matches(index)) {
            let section = BiquadSection::from_spec(spec, self.settings.sample_rate)?;
            runtime.push_section(section)?;
            debug!(
                channel = index,
                filter = %spec.filter_type,
                frequency = spec.frequency,
                q = spec.q,
                gain_db = spec.gain_db,
                "Filter section added"
            );
        }

        info!(
            channel = index,
            name = %config.name,
            gain_db = config.gain_db,
            delay_samples = runtime.delay_samples(),
            sections = runtime.cascade().len(),
            "Channel configured"
        );

        Ok(runtime)
    }
}

// ============================================================================
// DSP CONFIG FILE
// ============================================================================

/// Complete speakerdsp configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DspConfig {
    #[serde(default)]
    pub settings: EngineSettings,
    pub channels: Vec<ChannelConfig>,
    /// Coefficients produced by an external room-correction import
    #[serde(default)]
    pub imported_biquads: Vec<BiquadDef>,
    #[serde(default)]
    pub biquads: Vec<BiquadDef>,
    #[serde(default)]
    pub filters: Vec<FilterDef>,
}

impl Default for DspConfig {
    fn default() -> Self {
        Self::factory_default()
    }
}

impl DspConfig {
    /// Two pass-through channels, left and right
    pub fn factory_default() -> Self {
        Self {
            settings: EngineSettings::default(),
            channels: vec![
                ChannelConfig::new("Left", vec![true, false]),
                ChannelConfig::new("Right", vec![false, true]),
            ],
            imported_biquads: Vec::new(),
            biquads: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Resolve every parametric filter definition
    pub fn specs(&self) -> Result<Vec<FilterSpec>> {
        self.filters.iter().map(FilterDef::to_spec).collect()
    }

    /// Validate the configuration and build a ready-to-run engine
    pub fn build_engine(&self) -> Result<Engine> {
        let specs = self.specs()?;
        ConfigLoader::new(self.settings.clone())?.initialize(
            &self.channels,
            &self.imported_biquads,
            &self.biquads,
            &specs,
        )
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&contents)?;

        debug!(channels = config.channels.len(), "Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(path, self.to_toml_string()?).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }
}

// ============================================================================
// PRESETS
// ============================================================================

/// Saved presets in a directory of TOML files, layered over the built-ins
///
/// Built-in names always resolve to the built-in configuration and cannot be
/// overwritten or deleted.
pub struct PresetManager {
    preset_dir: PathBuf,
}

impl PresetManager {
    /// Create a new preset manager
    pub fn new(preset_dir: PathBuf) -> Self {
        Self { preset_dir }
    }

    /// `<config dir>/speakerdsp/presets`
    pub fn default_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("speakerdsp").join("presets"))
            .ok_or_else(|| {
                ConfigError::InvalidSettings("Could not determine config directory".to_string())
            })
    }

    fn preset_path(&self, name: &str) -> PathBuf {
        self.preset_dir.join(format!("{}.toml", name))
    }

    /// Names of the saved presets; empty until the directory exists
    #[instrument(skip(self))]
    pub async fn list_presets(&self) -> Result<Vec<String>> {
        let mut presets = Vec::new();
        if !self.preset_dir.exists() {
            return Ok(presets);
        }

        let mut entries = fs::read_dir(&self.preset_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "toml").unwrap_or(false) {
                if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                    presets.push(name.to_string());
                }
            }
        }

        presets.sort();
        debug!(count = presets.len(), "Listed presets");
        Ok(presets)
    }

    /// Load a preset by name, built-ins first
    #[instrument(skip(self))]
    pub async fn load_preset(&self, name: &str) -> Result<DspConfig> {
        if let Some(builtin) = presets::find(name) {
            return Ok(builtin.config);
        }
        let path = self.preset_path(name);

        if !path.exists() {
            return Err(ConfigError::PresetNotFound(name.to_string()));
        }

        DspConfig::load_from_file(&path).await
    }

    /// Save a preset by name
    ///
    /// The configuration must build; a preset that would fail at startup is
    /// never written.
    #[instrument(skip(self, config))]
    pub async fn save_preset(&self, name: &str, config: &DspConfig) -> Result<()> {
        if presets::find(name).is_some() {
            return Err(ConfigError::ReservedPresetName(name.to_string()));
        }
        config.build_engine()?;
        config.save_to_file(self.preset_path(name)).await
    }

    /// Delete a saved preset by name
    #[instrument(skip(self))]
    pub async fn delete_preset(&self, name: &str) -> Result<()> {
        if presets::find(name).is_some() {
            return Err(ConfigError::ReservedPresetName(name.to_string()));
        }
        let path = self.preset_path(name);

        if !path.exists() {
            return Err(ConfigError::PresetNotFound(name.to_string()));
        }

        fs::remove_file(&path).await?;
        info!(name, "Preset deleted");
        Ok(())
    }

    /// Check if a preset exists
    pub async fn preset_exists(&self, name: &str) -> bool {
        self.preset_path(name).exists()
    }
}
