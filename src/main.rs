use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, trace};
use std::path::PathBuf;
use std::time::Instant;

use flocking_engine::{FlockSimulation, FlockingConfig};

/// Command-line arguments for the headless flock runner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of ticks to run (overrides `run.ticks` from the config)
    #[arg(short, long)]
    ticks: Option<u32>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting flocking engine...");

    // --- Load Configuration ---
    let config = FlockingConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let total_ticks = args.ticks.unwrap_or(config.run.ticks);
    let record_interval = config.run.record_interval;

    if config.engine.parallel {
        info!("Using {} Rayon threads.", rayon::current_num_threads());
    }

    // --- Initialize Simulation ---
    let mut sim = FlockSimulation::new(&config)?;
    info!(
        "Flock initialized with {} agents, {:?} neighbor index.",
        sim.len(),
        sim.neighbor_index_kind()
    );
    debug!("Flocking parameters: {:#?}", sim.params());

    info!("Recording snapshot every {} ticks.", record_interval);
    info!("Starting simulation loop for {} ticks...", total_ticks);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    sim.record_snapshot();

    for tick in 0..total_ticks {
        let tick_start_time = Instant::now();
        sim.step().with_context(|| format!("tick {} failed", tick + 1))?;
        let tick_duration = tick_start_time.elapsed();

        let current_time = Instant::now();
        let print_interval_secs = 5.0;
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= print_interval_secs;
        let is_record_tick = (tick + 1) % record_interval == 0;
        let is_last_tick = tick + 1 == total_ticks;

        if is_record_tick || is_last_tick {
            let weights = sim.params().to_string();
            let snapshot = sim.record_snapshot();
            info!(
                "Tick [{}/{}] | {} | mean speed {:.3} | polarization {:.3} | isolated {} | Tick Time: {:6.2} ms",
                tick + 1,
                total_ticks,
                weights,
                snapshot.mean_speed,
                snapshot.polarization,
                snapshot.isolated_agents,
                tick_duration.as_secs_f64() * 1000.0
            );
            previous_print_time = current_time;
        } else if should_print_status {
            info!(
                "Tick [{}/{}] | Elapsed: {:.2} s",
                tick + 1,
                total_ticks,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;
        } else {
            trace!(
                "Tick [{}/{}] completed in {:.2} ms",
                tick + 1,
                total_ticks,
                tick_duration.as_secs_f64() * 1000.0
            );
        }
    }

    let total_duration = start_time.elapsed();
    info!(
        "Simulation finished in {:.3} seconds ({} snapshots recorded).",
        total_duration.as_secs_f64(),
        sim.recorded_snapshots().len()
    );

    Ok(())
}
