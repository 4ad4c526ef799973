//! Per-channel runtime and the block-processing engine
//!
//! Each output channel averages its selected inputs, runs the result through
//! a delay line and a biquad cascade, then applies make-up gain, optional
//! dither and a soft limiter before re-padding the samples for the driver.

pub mod delay;

use crate::domain::audio::{ProcessingError, Result, Sample, SampleFormat};
use crate::domain::config::{ChannelConfig, ConfigError, EngineSettings};
use crate::domain::diagnostics::{ChannelDiagnostics, EngineReport};
use crate::domain::dsp::dither::Dither;
use crate::domain::dsp::{BiquadSection, Cascade};
use delay::DelayLine;
use tracing::{debug, error};

// ============================================================================
// CHANNEL RUNTIME
// ============================================================================

/// Mutable state of one output channel
#[derive(Debug, Clone)]
pub struct ChannelRuntime {
    index: usize,
    name: String,
    sources: Vec<bool>,
    /// Number of selected sources, at least 1
    divisor: i64,
    gain_db: f64,
    delay_ms: u32,
    scaling_factor: f32,
    delay: DelayLine,
    cascade: Cascade,
    in_clip_count: u64,
    out_clip_count: u64,
    in_max_level: u32,
    out_max_level: u32,
    /// Last emitted value, feeds the soft limiter
    prev_output: i32,
}

impl ChannelRuntime {
    /// Validate `config` and allocate the channel's buffers
    pub fn new(
        index: usize,
        config: &ChannelConfig,
        settings: &EngineSettings,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate(settings)?;

        let delay = DelayLine::new(
            settings.max_delay_samples(),
            settings.delay_samples(config.delay_ms),
        )
        .map_err(|_| ConfigError::AllocationFailure {
            channel: config.name.clone(),
        })?;

        let selected = config.sources.iter().filter(|s| **s).count();

        Ok(Self {
            index,
            name: config.name.clone(),
            sources: config.sources.clone(),
            divisor: selected.max(1) as i64,
            gain_db: config.gain_db,
            delay_ms: config.delay_ms,
            scaling_factor: 10.0_f64.powf(config.gain_db / 20.0) as f32,
            delay,
            cascade: Cascade::with_capacity(settings.max_filters),
            in_clip_count: 0,
            out_clip_count: 0,
            in_max_level: 0,
            out_max_level: 0,
            prev_output: 0,
        })
    }

    /// Append a section to the end of the cascade
    pub fn push_section(&mut self, section: BiquadSection) -> std::result::Result<(), ConfigError> {
        self.cascade
            .try_push(section)
            .map_err(|full| ConfigError::TooManyFilters {
                channel: self.name.clone(),
                max: full.capacity,
            })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[bool] {
        &self.sources
    }

    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    pub fn scaling_factor(&self) -> f32 {
        self.scaling_factor
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    pub fn delay_samples(&self) -> usize {
        self.delay.len()
    }

    pub fn cascade(&self) -> &Cascade {
        &self.cascade
    }

    pub fn in_clip_count(&self) -> u64 {
        self.in_clip_count
    }

    pub fn out_clip_count(&self) -> u64 {
        self.out_clip_count
    }

    /// Largest mixed input magnitude seen in the last block
    pub fn in_max_level(&self) -> u32 {
        self.in_max_level
    }

    /// Largest emitted magnitude seen in the last block
    pub fn out_max_level(&self) -> u32 {
        self.out_max_level
    }

    pub fn reset_meters(&mut self) {
        self.in_clip_count = 0;
        self.out_clip_count = 0;
        self.in_max_level = 0;
        self.out_max_level = 0;
    }

    /// Mix the selected inputs of each frame and pass them through the delay
    /// line into `work`. Returns true if any mixed value clipped.
    ///
    /// With filters disabled the delay line is bypassed and left untouched.
    fn process_input(
        &mut self,
        input: &[Sample],
        format: SampleFormat,
        work: &mut [f32],
        filters_enabled: bool,
    ) -> bool {
        let width = self.sources.len();
        let max_level = format.max_level().unsigned_abs();
        let mut clipped = false;
        let mut block_max = 0;

        for (frame, slot) in input.chunks_exact(width).zip(work.iter_mut()) {
            let sum: i64 = frame
                .iter()
                .zip(&self.sources)
                .filter(|(_, selected)| **selected)
                .map(|(word, _)| i64::from(format.unpack(*word)))
                .sum();
            // The mean of i32 values always fits back into an i32
            let mixed = (sum / self.divisor) as i32;

            let level = mixed.unsigned_abs();
            block_max = block_max.max(level);
            if level >= max_level {
                self.in_clip_count += 1;
                clipped = true;
            }

            let value = if filters_enabled {
                self.delay.process(mixed)
            } else {
                mixed
            };
            *slot = value as f32;
        }

        self.in_max_level = block_max;
        clipped
    }

    fn process_filters(&mut self, work: &mut [f32]) -> Result<()> {
        self.cascade
            .apply(work)
            .map_err(|fault| ProcessingError::CascadeFailure {
                channel: self.index,
                section: fault.section,
            })
    }

    /// Scale, dither and limit `work` into this channel's interleaved output
    /// slots. Returns true if any sample had to be limited.
    fn process_output(
        &mut self,
        work: &[f32],
        output: &mut [Sample],
        format: SampleFormat,
        mut dither: Option<&mut Dither>,
        filters_enabled: bool,
    ) -> bool {
        let width = self.sources.len();
        let factor = if filters_enabled {
            self.scaling_factor
        } else {
            1.0
        };
        let max_level = format.max_level();
        let mut clipped = false;
        let mut block_max = 0;
        let mut prev = self.prev_output;

        for (sample, frame) in work.iter().zip(output.chunks_exact_mut(width)) {
            // Float to int casts saturate
            let mut value = (sample * factor) as i32;

            if let Some(dither) = dither.as_deref_mut() {
                value = dither.apply(value);
            }

            if value < -max_level || value > max_level {
                self.out_clip_count += 1;
                clipped = true;
                let rail = if value < 0 { -i64::from(max_level) } else { i64::from(max_level) };
                value = ((rail + i64::from(prev)) / 2) as i32;
            }

            block_max = block_max.max(value.unsigned_abs());
            frame[self.index] = format.pack(value);
            prev = value;
        }

        self.prev_output = prev;
        self.out_max_level = block_max;
        clipped
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Result of one successful block call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOutcome {
    /// Any channel clipped on input or output
    pub clipped: bool,
    pub frames: usize,
}

/// Multi-channel processing engine
///
/// Built by `ConfigLoader`. Block calls must not overlap; the engine does no
/// locking of its own.
#[derive(Debug, Clone)]
pub struct Engine {
    settings: EngineSettings,
    format: SampleFormat,
    channels: Vec<ChannelRuntime>,
    dither: Dither,
    dither_enabled: bool,
    work: Vec<f32>,
}

impl Engine {
    pub(crate) fn new(
        settings: EngineSettings,
        channels: Vec<ChannelRuntime>,
    ) -> std::result::Result<Self, ConfigError> {
        settings.validate()?;
        if channels.len() != settings.channels {
            return Err(ConfigError::ChannelCount {
                expected: settings.channels,
                found: channels.len(),
            });
        }

        let format = settings.sample_format()?;
        debug!(
            channels = channels.len(),
            sample_bits = format.sample_bits(),
            dither_bits = format.dither_bits(),
            "Engine ready"
        );

        Ok(Self {
            format,
            dither: Dither::new(format.dither_bits()),
            dither_enabled: settings.dither,
            work: vec![0.0; settings.max_block_frames],
            settings,
            channels,
        })
    }

    /// Process one interleaved block
    ///
    /// `filters_enabled = false` bypasses delay, cascade and make-up gain for
    /// this call. On error the contents of `output` are unspecified.
    pub fn process_block(
        &mut self,
        input: &[Sample],
        output: &mut [Sample],
        filters_enabled: bool,
    ) -> Result<BlockOutcome> {
        let width = self.channels.len();

        if input.len() != output.len() {
            return Err(ProcessingError::LengthMismatch {
                input: input.len(),
                output: output.len(),
            });
        }
        if input.len() % width != 0 {
            return Err(ProcessingError::MisalignedBlock {
                len: input.len(),
                channels: width,
            });
        }
        let frames = input.len() / width;
        if frames > self.settings.max_block_frames {
            return Err(ProcessingError::BlockTooLarge {
                frames,
                max: self.settings.max_block_frames,
            });
        }

        let Self {
            format,
            channels,
            dither,
            dither_enabled,
            work,
            ..
        } = self;
        let work = &mut work[..frames];
        let mut clipped = false;

        for channel in channels.iter_mut() {
            clipped |= channel.process_input(input, *format, work, filters_enabled);

            if filters_enabled {
                channel.process_filters(work).map_err(|e| {
                    error!(channel = channel.index, error = %e, "Block processing failed");
                    e
                })?;
            }

            let dither = if *dither_enabled { Some(&mut *dither) } else { None };
            clipped |= channel.process_output(work, output, *format, dither, filters_enabled);
        }

        Ok(BlockOutcome { clipped, frames })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn channels(&self) -> &[ChannelRuntime] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelRuntime> {
        self.channels.get(index)
    }

    pub fn dither_enabled(&self) -> bool {
        self.dither_enabled
    }

    pub fn set_dither(&mut self, enabled: bool) {
        debug!(enabled, "Dither toggled");
        self.dither_enabled = enabled;
    }

    /// Clear clip counters and level maxima on every channel
    pub fn reset_meters(&mut self) {
        self.channels.iter_mut().for_each(ChannelRuntime::reset_meters);
    }

    /// Magnitude response of a channel's cascade plus its make-up gain
    pub fn magnitude_db(&self, channel: usize, freq: f64) -> Option<f64> {
        let runtime = self.channels.get(channel)?;
        let fs = f64::from(self.settings.sample_rate);
        Some(runtime.cascade.magnitude_db(freq, fs) + runtime.gain_db)
    }

    /// `bands` log-spaced `(frequency, dB)` points from `low` to `high`
    pub fn response_curve(
        &self,
        channel: usize,
        low: f64,
        high: f64,
        bands: usize,
    ) -> Option<Vec<(f64, f64)>> {
        self.channels.get(channel)?;
        let step = if bands > 1 {
            (high / low).ln() / (bands - 1) as f64
        } else {
            0.0
        };

        (0..bands)
            .map(|band| {
                let freq = low * (step * band as f64).exp();
                self.magnitude_db(channel, freq).map(|db| (freq, db))
            })
            .collect()
    }

    /// Snapshot of settings, levels and resolved filters
    pub fn diagnostics(&self) -> EngineReport {
        EngineReport {
            sample_rate: self.settings.sample_rate,
            sample_bits: self.format.sample_bits(),
            block_frames: self.settings.max_block_frames,
            block_latency_ms: self.settings.block_period().as_secs_f64() * 1000.0,
            dither: self.dither_enabled,
            channels: self
                .channels
                .iter()
                .map(|c| ChannelDiagnostics::capture(c, self.format))
                .collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{BiquadDef, ChannelTarget, ConfigLoader};
    use crate::domain::dsp::{FilterSpec, FilterType, Precision};
    use proptest::prelude::*;

    const MAX: i32 = 8_388_607;

    fn engine_with(channels: &[ChannelConfig], filters: &[FilterSpec]) -> Engine {
        ConfigLoader::new(EngineSettings::default())
            .unwrap()
            .initialize(channels, &[], &[], filters)
            .unwrap()
    }

    fn stereo_passthrough() -> Engine {
        engine_with(
            &[
                ChannelConfig::new("Left", vec![true, false]),
                ChannelConfig::new("Right", vec![false, true]),
            ],
            &[],
        )
    }

    /// Interleave two channels of unpadded values into storage words
    fn interleave(left: &[i32], right: &[i32]) -> Vec<Sample> {
        left.iter()
            .zip(right)
            .flat_map(|(l, r)| [l << 8, r << 8])
            .collect()
    }

    fn channel_values(block: &[Sample], channel: usize) -> Vec<i32> {
        block.iter().skip(channel).step_by(2).map(|w| w >> 8).collect()
    }

    #[test]
    fn test_passthrough_preserves_samples() {
        let mut engine = stereo_passthrough();
        let input = interleave(&[1, -2, 300, MAX - 1], &[-5, 6, -700, -(MAX - 1)]);
        let mut output = vec![0; input.len()];

        let outcome = engine.process_block(&input, &mut output, true).unwrap();

        assert_eq!(outcome, BlockOutcome { clipped: false, frames: 4 });
        assert_eq!(output, input);
    }

    #[test]
    fn test_null_bits_are_masked_on_input() {
        let mut engine = stereo_passthrough();
        let input = vec![(100 << 8) | 0xFF, (-100 << 8) | 0x7F];
        let mut output = vec![0; 2];
        engine.process_block(&input, &mut output, true).unwrap();
        assert_eq!(output, vec![100 << 8, -100 << 8]);
    }

    #[test]
    fn test_mix_averages_selected_sources() {
        let mut engine = engine_with(
            &[
                ChannelConfig::new("Sum", vec![true, true]),
                ChannelConfig::new("Muted", vec![false, false]),
            ],
            &[],
        );
        let input = interleave(&[1000, -3, MAX], &[2001, 0, MAX]);
        let mut output = vec![0; input.len()];
        engine.process_block(&input, &mut output, true).unwrap();

        // Division truncates toward zero
        assert_eq!(channel_values(&output, 0), vec![1500, -1, MAX]);
        assert_eq!(channel_values(&output, 1), vec![0, 0, 0]);
    }

    #[test]
    fn test_gain_applied_only_when_enabled() {
        let mut engine = engine_with(
            &[
                ChannelConfig::new("Left", vec![true, false]).with_gain(-6.0),
                ChannelConfig::new("Right", vec![false, true]),
            ],
            &[],
        );
        let input = interleave(&[10_000], &[10_000]);
        let mut output = vec![0; 2];

        engine.process_block(&input, &mut output, true).unwrap();
        let factor = engine.channel(0).unwrap().scaling_factor();
        assert!((factor - 0.501_187).abs() < 1e-5);
        assert_eq!(channel_values(&output, 0), vec![(10_000.0 * factor) as i32]);
        assert_eq!(channel_values(&output, 1), vec![10_000]);

        engine.process_block(&input, &mut output, false).unwrap();
        assert_eq!(channel_values(&output, 0), vec![10_000]);
    }

    #[test]
    fn test_delay_spans_blocks() {
        let mut engine = engine_with(
            &[
                ChannelConfig::new("Delayed", vec![true, false]).with_delay(3),
                ChannelConfig::new("Right", vec![false, true]),
            ],
            &[],
        );
        let delay = engine.channel(0).unwrap().delay_samples();
        assert_eq!(delay, 132);

        let mut emitted = Vec::new();
        for block in 0..4 {
            let left: Vec<i32> = (0..96).map(|i| i32::from(block == 0 && i == 0) * 1234).collect();
            let input = interleave(&left, &[0; 96]);
            let mut output = vec![0; input.len()];
            engine.process_block(&input, &mut output, true).unwrap();
            emitted.extend(channel_values(&output, 0));
        }

        let hits: Vec<usize> = emitted
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(hits, vec![delay]);
        assert_eq!(emitted[delay], 1234);
    }

    #[test]
    fn test_bypass_leaves_delay_line_untouched() {
        let mut engine = engine_with(
            &[
                ChannelConfig::new("Delayed", vec![true, false]).with_delay(3),
                ChannelConfig::new("Right", vec![false, true]),
            ],
            &[],
        );

        // Prime the delay line with one impulse, then bypass for a while
        let mut output = vec![0; 2];
        engine.process_block(&interleave(&[777], &[0]), &mut output, true).unwrap();
        for _ in 0..300 {
            engine.process_block(&interleave(&[55], &[0]), &mut output, false).unwrap();
            assert_eq!(channel_values(&output, 0), vec![55]);
        }

        // Re-enabled: the impulse still emerges after the configured delay
        let mut emitted = Vec::new();
        for _ in 0..132 {
            engine.process_block(&interleave(&[0], &[0]), &mut output, true).unwrap();
            emitted.extend(channel_values(&output, 0));
        }
        assert_eq!(emitted[131], 777);
        assert!(emitted[..131].iter().all(|v| *v == 0));
    }

    #[test]
    fn test_input_clipping_counted_per_occurrence() {
        let mut engine = stereo_passthrough();
        let input = interleave(&[MAX, 0, -MAX - 1, MAX - 1], &[0, 0, 0, 0]);
        let mut output = vec![0; input.len()];

        let outcome = engine.process_block(&input, &mut output, true).unwrap();

        assert!(outcome.clipped);
        let left = engine.channel(0).unwrap();
        assert_eq!(left.in_clip_count(), 2);
        assert_eq!(left.in_max_level(), MAX as u32 + 1);
        assert_eq!(engine.channel(1).unwrap().in_clip_count(), 0);
    }

    #[test]
    fn test_output_soft_limiter() {
        let mut engine = engine_with(
            &[
                ChannelConfig::new("Hot", vec![true, false]).with_gain(6.0),
                ChannelConfig::new("Right", vec![false, true]),
            ],
            &[],
        );
        let input = interleave(&[1000, MAX - 10, MAX - 10], &[0, 0, 0]);
        let mut output = vec![0; input.len()];

        let outcome = engine.process_block(&input, &mut output, true).unwrap();
        assert!(outcome.clipped);

        let left = channel_values(&output, 0);
        let first = (1000.0_f32 * 10.0_f64.powf(6.0 / 20.0) as f32) as i32;
        assert_eq!(left[0], first);
        assert_eq!(left[1], (MAX + first) / 2);
        assert_eq!(left[2], (MAX + left[1]) / 2);
        assert_eq!(engine.channel(0).unwrap().out_clip_count(), 2);
        assert!(left.iter().all(|v| v.abs() <= MAX));
    }

    #[test]
    fn test_limiter_history_carries_across_blocks() {
        let mut engine = engine_with(
            &[
                ChannelConfig::new("Hot", vec![true, false]).with_gain(6.0),
                ChannelConfig::new("Right", vec![false, true]),
            ],
            &[],
        );
        let mut output = vec![0; 2];
        engine.process_block(&interleave(&[-4000], &[0]), &mut output, true).unwrap();
        let prev = channel_values(&output, 0)[0];

        engine.process_block(&interleave(&[-MAX], &[0]), &mut output, true).unwrap();
        assert_eq!(channel_values(&output, 0), vec![(-MAX + prev) / 2]);
    }

    #[test]
    fn test_dither_only_touches_low_bits() {
        let mut engine = stereo_passthrough();
        engine.set_dither(true);
        assert!(engine.dither_enabled());

        let values: Vec<i32> = (0..96).map(|i| i * 10_007 - 480_000).collect();
        let input = interleave(&values, &values);
        let mut output = vec![0; input.len()];
        engine.process_block(&input, &mut output, true).unwrap();

        for (out, original) in channel_values(&output, 0).iter().zip(&values) {
            assert!((out - original).abs() < 512, "{out} vs {original}");
        }
    }

    #[test]
    fn test_block_shape_errors() {
        let mut engine = stereo_passthrough();
        let mut output = vec![0; 4];

        assert_eq!(
            engine.process_block(&[0; 3], &mut output[..3], true),
            Err(ProcessingError::MisalignedBlock { len: 3, channels: 2 })
        );
        assert_eq!(
            engine.process_block(&[0; 2], &mut output, true),
            Err(ProcessingError::LengthMismatch { input: 2, output: 4 })
        );

        let big = vec![0; 2 * 97];
        let mut big_out = vec![0; 2 * 97];
        assert_eq!(
            engine.process_block(&big, &mut big_out, true),
            Err(ProcessingError::BlockTooLarge { frames: 97, max: 96 })
        );

        assert_eq!(
            engine.process_block(&[], &mut [], true),
            Ok(BlockOutcome { clipped: false, frames: 0 })
        );
    }

    #[test]
    fn test_cascade_failure_is_reported() {
        let unstable = BiquadDef::new(
            ChannelTarget::Channel(1),
            [1.0, 0.0, 0.0, 3.0, 0.0],
            Precision::Single,
        );
        let mut engine = ConfigLoader::new(EngineSettings::default())
            .unwrap()
            .initialize(
                &[
                    ChannelConfig::new("Left", vec![true, false]),
                    ChannelConfig::new("Right", vec![false, true]),
                ],
                &[],
                &[unstable],
                &[],
            )
            .unwrap();

        let input = interleave(&[MAX; 96], &[MAX; 96]);
        let mut output = vec![0; input.len()];
        assert_eq!(
            engine.process_block(&input, &mut output, true),
            Err(ProcessingError::CascadeFailure { channel: 1, section: 0 })
        );

        // Bypassed filters never run the cascade
        assert!(engine.process_block(&input, &mut output, false).is_ok());
    }

    #[test]
    fn test_reset_meters() {
        let mut engine = stereo_passthrough();
        let input = interleave(&[MAX], &[MAX]);
        let mut output = vec![0; 2];
        engine.process_block(&input, &mut output, true).unwrap();
        assert_eq!(engine.channel(0).unwrap().in_clip_count(), 1);

        engine.reset_meters();
        let left = engine.channel(0).unwrap();
        assert_eq!(left.in_clip_count(), 0);
        assert_eq!(left.in_max_level(), 0);
    }

    #[test]
    fn test_response_curve_includes_gain() {
        let lpf = FilterSpec::new(ChannelTarget::All, FilterType::LowPass, 1000.0, 0.707, 0.0);
        let engine = engine_with(
            &[
                ChannelConfig::new("Left", vec![true, false]).with_gain(3.0),
                ChannelConfig::new("Right", vec![false, true]),
            ],
            &[lpf],
        );

        let curve = engine.response_curve(0, 20.0, 20_480.0, 11).unwrap();
        assert_eq!(curve.len(), 11);
        assert!((curve[0].0 - 20.0).abs() < 1e-9);
        assert!((curve[10].0 - 20_480.0).abs() < 1e-6);
        // Octave spacing
        assert!((curve[1].0 - 40.0).abs() < 1e-9);
        assert!((curve[0].1 - 3.0).abs() < 0.01);
        assert!(curve[10].1 < -30.0);

        assert!(engine.response_curve(5, 20.0, 20_480.0, 11).is_none());
        assert_eq!(engine.magnitude_db(1, 20.0).map(|db| db.abs() < 0.01), Some(true));
    }

    proptest! {
        #[test]
        fn prop_unselected_channel_is_silent(
            values in proptest::collection::vec(i32::MIN..=i32::MAX, 2..=192)
        ) {
            let mut engine = engine_with(
                &[
                    ChannelConfig::new("Live", vec![true, true]),
                    ChannelConfig::new("Muted", vec![false, false]),
                ],
                &[],
            );
            let frames = values.len() / 2;
            let input = &values[..frames * 2];
            let mut output = vec![0; input.len()];
            engine.process_block(input, &mut output, true).unwrap();

            prop_assert!(channel_values(&output, 1).iter().all(|v| *v == 0));
        }

        #[test]
        fn prop_output_stays_in_range(
            values in proptest::collection::vec(i32::MIN..=i32::MAX, 2..=192),
            gain in -24.0f64..=24.0,
            dither in any::<bool>(),
        ) {
            let peq = FilterSpec::new(ChannelTarget::All, FilterType::PeakingEq, 1000.0, 1.0, 12.0);
            let mut engine = engine_with(
                &[
                    ChannelConfig::new("Left", vec![true, false]).with_gain(gain),
                    ChannelConfig::new("Right", vec![true, true]),
                ],
                &[peq],
            );
            engine.set_dither(dither);

            let frames = values.len() / 2;
            let input = &values[..frames * 2];
            let mut output = vec![0; input.len()];
            engine.process_block(input, &mut output, true).unwrap();

            for word in output {
                prop_assert_eq!(word & 0xFF, 0);
                prop_assert!((word >> 8).abs() <= MAX);
            }
        }
    }
}
