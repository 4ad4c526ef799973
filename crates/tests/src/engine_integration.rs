//! Integration tests for the processing pipeline
//!
//! Configurations go in through the loader or a TOML file and samples go
//! through the engine directly or through the DSP thread.

use proptest::prelude::*;
use speakerdsp_core::{
    presets, ChannelConfig, DspConfig, Engine, EngineSettings, FilterType, Sample, SampleFormat,
};
use speakerdsp_infra::{DspWorker, ExitReason, LockFreeBlockQueue, QueueSink, SliceSource};
use std::time::Duration;

const FORMAT: SampleFormat = SampleFormat::BITS_24;
const SAMPLE_RATE: f64 = 44_100.0;

fn config(channels: Vec<ChannelConfig>) -> DspConfig {
    DspConfig {
        channels,
        ..DspConfig::factory_default()
    }
}

/// Same mono signal on every input, packed into storage words
fn interleave_mono(values: &[i32], width: usize) -> Vec<Sample> {
    values
        .iter()
        .flat_map(|&v| std::iter::repeat(FORMAT.pack(v)).take(width))
        .collect()
}

fn sine(freq: f64, amplitude: f64, frames: usize) -> Vec<i32> {
    (0..frames)
        .map(|n| {
            let phase = std::f64::consts::TAU * freq * n as f64 / SAMPLE_RATE;
            (amplitude * phase.sin()).round() as i32
        })
        .collect()
}

/// Feed `input` block by block at the engine's maximum block size
fn run_blocks(engine: &mut Engine, input: &[Sample]) -> Vec<Sample> {
    let block = engine.settings().max_block_frames * engine.channels().len();
    let mut output = vec![0; input.len()];
    for (src, dst) in input.chunks(block).zip(output.chunks_mut(block)) {
        engine.process_block(src, dst, true).unwrap();
    }
    output
}

fn channel_peak(output: &[Sample], width: usize, channel: usize, skip_frames: usize) -> i32 {
    output
        .chunks(width)
        .skip(skip_frames)
        .map(|frame| FORMAT.unpack(frame[channel]).abs())
        .max()
        .unwrap_or(0)
}

// ============================================================================
// FILTERING
// ============================================================================

#[test]
fn test_crossover_measured_response_matches_design() {
    let mut engine = presets::two_way_active_crossover().build_engine().unwrap();
    let amplitude = 2_000_000.0;

    for freq in [60.0, 200.0, 1000.0] {
        engine.reset_meters();
        let input = interleave_mono(&sine(freq, amplitude, 44_100), 2);
        let output = run_blocks(&mut engine, &input);

        for channel in 0..2 {
            let expected = engine.magnitude_db(channel, freq).unwrap();
            if expected < -40.0 {
                continue;
            }
            // Second half only, once the transient has settled
            let peak = channel_peak(&output, 2, channel, 22_050);
            let measured = 20.0 * (f64::from(peak) / amplitude).log10();
            assert!(
                (measured - expected).abs() < 0.5,
                "channel {channel} at {freq} Hz: measured {measured:.2} dB, designed {expected:.2} dB"
            );
        }
    }
}

#[test]
fn test_filter_types_from_toml_build() {
    let mut toml = String::from("[[channels]]\nname = \"A\"\nsources = [true, false]\n");
    toml.push_str("[[channels]]\nname = \"B\"\nsources = [false, true]\n");
    for filter_type in FilterType::ALL {
        toml.push_str(&format!(
            "[[filters]]\nchannel = 0\nfilter_type = {}\nfrequency = 1000.0\nq = 0.7\ngain_db = 3.0\n",
            filter_type.code()
        ));
    }

    let config = DspConfig::from_toml_str(&toml).unwrap();
    let engine = config.build_engine().unwrap();
    assert_eq!(engine.channel(0).unwrap().cascade().len(), FilterType::ALL.len());
    assert!(engine.channel(1).unwrap().cascade().is_empty());
}

// ============================================================================
// DELAY, GAIN AND CLIPPING
// ============================================================================

#[test]
fn test_impulse_delay_through_worker() {
    let engine = config(vec![
        ChannelConfig::new("Delayed", vec![true, false]).with_delay(10),
        ChannelConfig::new("Direct", vec![true, false]),
    ])
    .build_engine()
    .unwrap();
    assert_eq!(engine.channel(0).unwrap().delay_samples(), 441);

    let mut mono = vec![0; 960];
    mono[0] = 1_000_000;
    let input = interleave_mono(&mono, 2);
    let (producer, mut consumer) = LockFreeBlockQueue::with_capacity(input.len());

    let worker = DspWorker::builder(engine)
        .spawn(
            SliceSource::new(input),
            QueueSink::new(producer, Duration::from_secs(5)),
        )
        .unwrap();
    let exit = worker.join().unwrap();
    assert!(matches!(exit.reason, ExitReason::EndOfStream));
    assert_eq!(exit.blocks, 10);

    let output = consumer.drain();
    assert_eq!(output.len(), 1920);
    for (frame, pair) in output.chunks(2).enumerate() {
        let delayed = if frame == 441 { 1_000_000 } else { 0 };
        let direct = if frame == 0 { 1_000_000 } else { 0 };
        assert_eq!(FORMAT.unpack(pair[0]), delayed, "delayed channel, frame {frame}");
        assert_eq!(FORMAT.unpack(pair[1]), direct, "direct channel, frame {frame}");
    }
}

#[test]
fn test_gain_boost_clips_and_counts() {
    let mut engine = config(vec![
        ChannelConfig::new("Boosted", vec![true, false]).with_gain(12.0),
        ChannelConfig::new("Flat", vec![false, true]),
    ])
    .build_engine()
    .unwrap();

    let input = interleave_mono(&sine(440.0, 4_000_000.0, 960), 2);
    let output = run_blocks(&mut engine, &input);

    let max = FORMAT.max_level();
    assert!(output.iter().all(|&s| FORMAT.unpack(s).abs() <= max));
    // The limiter eases towards the rail rather than landing on it
    let peak = channel_peak(&output, 2, 0, 0);
    assert!(peak > max / 10 * 9, "{peak}");

    let report = engine.diagnostics();
    assert!(report.any_clipping());
    assert!(report.channels[0].out_clip_count > 0);
    assert_eq!(report.channels[1].out_clip_count, 0);
    assert_eq!(report.channels[0].in_clip_count, 0);
}

#[test]
fn test_silence_stays_silent_with_filters() {
    for preset in presets::builtin() {
        let mut engine = preset.config.build_engine().unwrap();
        let input = vec![0; 96 * 2 * 20];
        let output = run_blocks(&mut engine, &input);
        assert!(output.iter().all(|&s| s == 0), "{}", preset.name);
        assert!(!engine.diagnostics().any_clipping());
    }
}

#[test]
fn test_dithered_output_is_deterministic() {
    let mut config = presets::subwoofer_crossover_correction();
    let input = interleave_mono(&sine(50.0, 1_000_000.0, 9_600), 2);
    let plain = run_blocks(&mut config.build_engine().unwrap(), &input);

    config.settings.dither = true;
    let first = run_blocks(&mut config.build_engine().unwrap(), &input);
    let second = run_blocks(&mut config.build_engine().unwrap(), &input);

    assert_eq!(first, second);
    assert_ne!(first, plain);
    // Noise stays within the 8 dither bits of a 24-bit sample
    for (d, p) in first.iter().zip(&plain) {
        assert!((FORMAT.unpack(*d) - FORMAT.unpack(*p)).abs() <= 512);
    }
}

// ============================================================================
// CONFIG FILES
// ============================================================================

#[tokio::test]
async fn test_config_file_round_trip_preserves_response() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("speakers.toml");

    let original = presets::subwoofer_crossover_correction();
    original.save_to_file(&path).await.unwrap();
    let loaded = DspConfig::load_from_file(&path).await.unwrap();
    assert_eq!(loaded, original);

    let a = original.build_engine().unwrap();
    let b = loaded.build_engine().unwrap();
    for freq in [20.0, 35.0, 60.0, 120.0, 500.0] {
        assert_eq!(a.magnitude_db(0, freq), b.magnitude_db(0, freq));
    }
}

#[test]
fn test_invalid_settings_are_rejected() {
    let mut config = DspConfig::factory_default();
    config.settings = EngineSettings {
        channels: 3,
        ..EngineSettings::default()
    };
    assert!(config.build_engine().is_err());

    let config = config_with_delay(1);
    assert!(config.build_engine().is_err());
    assert!(config_with_delay(0).build_engine().is_ok());
    assert!(config_with_delay(250).build_engine().is_ok());
    assert!(config_with_delay(251).build_engine().is_err());
}

fn config_with_delay(delay_ms: u32) -> DspConfig {
    config(vec![
        ChannelConfig::new("Left", vec![true, false]).with_delay(delay_ms),
        ChannelConfig::new("Right", vec![false, true]),
    ])
}

proptest! {
    #[test]
    fn prop_passthrough_is_bit_exact(values in prop::collection::vec(-8_388_607i32..=8_388_607, 2..384)) {
        let mut values = values;
        values.truncate(values.len() / 2 * 2);
        let input: Vec<Sample> = values.iter().map(|&v| FORMAT.pack(v)).collect();

        let mut engine = DspConfig::factory_default().build_engine().unwrap();
        let output = run_blocks(&mut engine, &input);
        prop_assert_eq!(output, input);
    }
}
