//! speakerdsp command-line front end

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use speakerdsp_core::{presets, DspConfig, Engine, PresetManager, Sample};
use speakerdsp_infra::{DspWorker, ExitReason, LockFreeBlockQueue, QueueSink, SliceSource};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "speakerdsp")]
#[command(about = "Multi-channel biquad EQ and crossover engine", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print settings, channels and resolved filters
    Info {
        #[command(flatten)]
        source: ConfigSource,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the magnitude response of one channel
    Response {
        #[command(flatten)]
        source: ConfigSource,
        #[arg(short, long)]
        channel: usize,
        #[arg(long, default_value_t = 20.0)]
        low: f64,
        #[arg(long, default_value_t = 20_000.0)]
        high: f64,
        #[arg(long, default_value_t = 31)]
        bands: usize,
    },
    /// List built-in and saved presets
    Presets,
    /// Run a synthetic signal through the DSP thread
    Simulate {
        #[command(flatten)]
        source: ConfigSource,
        /// Frames of signal to generate
        #[arg(long, default_value_t = 44_100)]
        frames: usize,
        /// Unit impulse instead of a sine
        #[arg(long)]
        impulse: bool,
        /// Sine frequency in Hz
        #[arg(long, default_value_t = 1000.0)]
        freq: f64,
        /// Sine amplitude in dBFS
        #[arg(long, default_value_t = -6.0)]
        level: f64,
        /// Process with filters, delay and gain bypassed
        #[arg(long)]
        bypass: bool,
    },
    /// Write a preset as a TOML config file
    Export {
        #[arg(short, long)]
        preset: String,
        #[arg(short, long)]
        out: PathBuf,
    },
}

/// Where the configuration comes from; factory default when neither is given
#[derive(Args)]
struct ConfigSource {
    /// TOML config file
    #[arg(long, conflicts_with = "preset")]
    config: Option<PathBuf>,
    /// Built-in or saved preset name
    #[arg(long)]
    preset: Option<String>,
}

impl ConfigSource {
    async fn load(&self) -> anyhow::Result<DspConfig> {
        if let Some(path) = &self.config {
            return DspConfig::load_from_file(path)
                .await
                .with_context(|| format!("loading {}", path.display()));
        }

        match &self.preset {
            None => Ok(DspConfig::factory_default()),
            Some(name) => {
                if let Some(builtin) = presets::find(name) {
                    return Ok(builtin.config);
                }
                let manager = PresetManager::new(PresetManager::default_dir()?);
                manager
                    .load_preset(name)
                    .await
                    .with_context(|| format!("loading preset '{name}'"))
            }
        }
    }

    async fn engine(&self) -> anyhow::Result<Engine> {
        let config = self.load().await?;
        Ok(config.build_engine()?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Info { source, json } => {
            let report = source.engine().await?.diagnostics();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
        }
        Command::Response {
            source,
            channel,
            low,
            high,
            bands,
        } => {
            if !(low > 0.0 && high > low) {
                bail!("frequency range must satisfy 0 < low < high");
            }
            let engine = source.engine().await?;
            let curve = engine
                .response_curve(channel, low, high, bands)
                .ok_or_else(|| anyhow!("no channel {channel}"))?;
            for (freq, db) in curve {
                println!("{freq:10.1} Hz  {db:8.2} dB");
            }
        }
        Command::Presets => list_presets().await?,
        Command::Simulate {
            source,
            frames,
            impulse,
            freq,
            level,
            bypass,
        } => {
            let engine = source.engine().await?;
            let signal = if impulse {
                Signal::Impulse
            } else {
                Signal::Sine { freq, level }
            };
            simulate(engine, frames, signal, bypass)?;
        }
        Command::Export { preset, out } => {
            let builtin =
                presets::find(&preset).ok_or_else(|| anyhow!("unknown built-in preset '{preset}'"))?;
            builtin.config.save_to_file(&out).await?;
            tracing::info!(preset = %preset, path = %out.display(), "Preset exported");
        }
    }

    Ok(())
}

async fn list_presets() -> anyhow::Result<()> {
    println!("Built-in:");
    for preset in presets::builtin() {
        println!("  {:32} {}", preset.name, preset.description);
    }

    // A missing config directory just means nothing has been saved yet
    let saved = match PresetManager::default_dir() {
        Ok(dir) => PresetManager::new(dir).list_presets().await.unwrap_or_default(),
        Err(_) => Vec::new(),
    };
    if !saved.is_empty() {
        println!("Saved:");
        for name in saved {
            println!("  {name}");
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Impulse,
    Sine { freq: f64, level: f64 },
}

/// Interleaved test signal fed identically to every input
fn generate(engine: &Engine, frames: usize, signal: Signal) -> Vec<Sample> {
    let format = engine.format();
    let width = engine.channels().len();
    let full_scale = f64::from(format.max_level());
    let sample_rate = f64::from(engine.settings().sample_rate);

    (0..frames)
        .flat_map(|frame| {
            let value = match signal {
                Signal::Impulse if frame == 0 => format.max_level(),
                Signal::Impulse => 0,
                Signal::Sine { freq, level } => {
                    let amplitude = full_scale * 10f64.powf(level / 20.0);
                    let phase = std::f64::consts::TAU * freq * frame as f64 / sample_rate;
                    (amplitude * phase.sin()).round() as i32
                }
            };
            std::iter::repeat(format.pack(value)).take(width)
        })
        .collect()
}

fn simulate(engine: Engine, frames: usize, signal: Signal, bypass: bool) -> anyhow::Result<()> {
    let input = generate(&engine, frames, signal);
    let (producer, mut consumer) = LockFreeBlockQueue::with_capacity(input.len().max(1));

    let worker = DspWorker::builder(engine)
        .filters_enabled(!bypass)
        .spawn(
            SliceSource::new(input),
            QueueSink::new(producer, Duration::from_secs(1)),
        )?;

    let exit = worker.join()?;
    if let ExitReason::Failed(e) = exit.reason {
        return Err(e.into());
    }

    let output = consumer.drain();
    let peak = output.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
    tracing::info!(blocks = exit.blocks, samples = output.len(), peak, "Simulation finished");
    print!("{}", exit.engine.diagnostics());
    Ok(())
}
