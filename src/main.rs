use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use log::{info, warn, debug, trace};
use serde::Serialize;

use swarm_common::{OutputFormat, SimParams, SimulationConfig, Snapshot};
use swarm_engine::{NeighborStats, Simulation};

const STATUS_INTERVAL_SECS: f64 = 5.0;

/// Written next to the snapshots at the end of a run.
#[derive(Serialize)]
struct RunSummary<'a> {
    params: &'a SimParams,
    particle_count: usize,
    ticks: u64,
    wall_time_secs: f64,
    final_neighbors: NeighborStats,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    info!("Starting Swarm Engine (CPU Parallel)...");

    // --- Load Configuration ---
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = SimulationConfig::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);
    if let (None, None, Some(display)) = (config.domain.width, config.domain.height, &config.domain.display) {
        debug!(
            "Domain calibrated from {}x{} px display ({:.3} px per unit).",
            display.width_px,
            display.height_px,
            display.pixels_per_unit()?
        );
    }

    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Simulation ---
    let mut sim = Simulation::from_config(&config).context("Failed to initialize simulation")?;
    debug!("Update order: {:?}, fast reject: {:?}", sim.params().update_order, sim.params().fast_reject);

    // --- Simulation Loop ---
    let total_steps = config.timing.total_steps;
    let mut record_interval_steps = config.timing.record_interval_steps;
    if record_interval_steps == 0 {
        warn!("record_interval_steps is 0. Recording every tick.");
        record_interval_steps = 1;
    }
    info!("Recording snapshot every {} ticks.", record_interval_steps);

    info!("Starting simulation loop for {} ticks...", total_steps);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    if config.output.save_frames {
        sim.record_snapshot();
    }

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        sim.step();
        let step_duration = step_start_time.elapsed();

        let current_time = Instant::now();
        let should_print_status =
            current_time.duration_since(previous_print_time).as_secs_f64() >= STATUS_INTERVAL_SECS;
        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step + 1 == total_steps;

        if should_print_status || is_last_step {
            let stats = sim.neighbor_stats();
            info!(
                "Tick [{}/{}] | Particles: {} | Avg neighbors: {:.2} | Max: {} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                step + 1,
                total_steps,
                sim.particle_count(),
                stats.mean,
                stats.max,
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;
        } else {
            trace!(
                "Tick [{}/{}] completed in {:.2} ms",
                step + 1,
                total_steps,
                step_duration.as_secs_f64() * 1000.0
            );
        }

        if config.output.save_frames && (is_record_step || is_last_step) {
            sim.record_snapshot();
        }
    }

    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());

    // --- Save Recorded Data ---
    if config.output.save_frames {
        let filename = format!("{}_snapshots.{}", config.output.base_filename, config.output.format.extension());
        write_snapshots(Path::new(&filename), config.output.format, sim.recorded_snapshots())?;
        info!("{} snapshots saved to {}", sim.recorded_snapshots().len(), filename);
    } else {
        info!("Skipping snapshots as per config (save_frames is false).");
    }

    if config.output.save_final_positions {
        let filename = format!("{}_final_positions.csv", config.output.base_filename);
        write_final_positions(Path::new(&filename), &sim)?;
        info!("Final positions saved to {}", filename);
    } else {
        info!("Skipping final positions as per config.");
    }

    let summary = RunSummary {
        params: sim.params(),
        particle_count: sim.particle_count(),
        ticks: sim.current_step(),
        wall_time_secs: total_duration.as_secs_f64(),
        final_neighbors: sim.neighbor_stats(),
    };
    let filename = format!("{}_summary.json", config.output.base_filename);
    let file = File::create(&filename)
        .with_context(|| format!("Error creating summary file '{}'", filename))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &summary)
        .context("Error serializing run summary")?;
    writer.flush()?;
    info!("Run summary saved to {}", filename);

    info!("Simulation Complete.");
    Ok(())
}

/// Serializes recorded snapshots in the configured format.
fn write_snapshots(path: &Path, format: OutputFormat, snapshots: &[Snapshot]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Error creating snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        OutputFormat::Json => serde_json::to_writer(&mut writer, snapshots)
            .context("Error serializing snapshots to JSON")?,
        OutputFormat::Bincode => bincode::serialize_into(&mut writer, snapshots)
            .context("Error serializing snapshots to bincode")?,
        OutputFormat::Messagepack => rmp_serde::encode::write(&mut writer, snapshots)
            .context("Error serializing snapshots to MessagePack")?,
    }
    writer.flush()?;
    Ok(())
}

fn write_final_positions(path: &Path, sim: &Simulation) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Error creating CSV file '{}'", path.display()))?;
    writer.write_record(["x", "y", "heading", "neighbors", "tag"])?;
    for p in sim.snapshot().particles() {
        writer.write_record(&[
            format!("{:.4}", p.x),
            format!("{:.4}", p.y),
            format!("{:.4}", p.heading),
            p.neighbor_count.to_string(),
            format!("{:?}", p.render_tag).to_lowercase(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
