//! Example demonstrating configuration files, presets and the engine report
//!
//! Run with: cargo run --package speakerdsp-core --example config_demo

use speakerdsp_core::domain::config::{presets, DspConfig, PresetManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("speakerdsp_core=debug,info")
        .init();

    println!("=== speakerdsp Configuration Demo ===\n");

    // 1. Built-in presets
    println!("1. Built-in presets:");
    for preset in presets::builtin() {
        println!("   - {:<32} {}", preset.name, preset.description);
    }

    // 2. Save one to a file and read it back
    println!("\n2. Round-tripping a preset through TOML...");
    let config_path = "demo_config.toml";
    let config = presets::subwoofer_crossover_correction();
    config.save_to_file(config_path).await?;
    let loaded = DspConfig::load_from_file(config_path).await?;
    println!(
        "   ✓ Loaded {} channels and {} filters",
        loaded.channels.len(),
        loaded.filters.len()
    );

    // 3. Build the engine and push a block of silence through it
    println!("\n3. Building the engine...");
    let mut engine = loaded.build_engine()?;
    let input = vec![0; engine.settings().channels * engine.settings().max_block_frames];
    let mut output = vec![0; input.len()];
    let outcome = engine.process_block(&input, &mut output, true)?;
    println!("   ✓ Processed {} frames, clipped: {}", outcome.frames, outcome.clipped);

    // 4. Frequency response of the first channel
    println!("\n4. Channel A response:");
    for (freq, db) in engine.response_curve(0, 20.0, 320.0, 5).unwrap_or_default() {
        println!("   {:>7.1} Hz  {:>7.2} dB", freq, db);
    }

    // 5. Diagnostics report
    println!("\n5. Report:\n{}", engine.diagnostics());

    // 6. Preset management
    println!("6. Preset management:");
    let preset_dir = std::path::PathBuf::from("demo_presets");
    let preset_manager = PresetManager::new(preset_dir.clone());
    preset_manager.save_preset("my_preset", &loaded).await?;
    for preset in preset_manager.list_presets().await? {
        println!("   - {}", preset);
    }

    println!("\n=== Demo Complete ===");

    std::fs::remove_file(config_path)?;
    std::fs::remove_dir_all(preset_dir)?;

    Ok(())
}
