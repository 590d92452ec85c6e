use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::{debug, info};

use drive_trace::simulation::{
    generate_trajectory_file, CoordinateMapping, GeneratorOptions, PlayerControls, SimWorld,
    SimulationConfig, TrajectoryTable, WarningLog,
};

#[derive(Parser)]
#[command(name = "drive_trace")]
#[command(about = "Headless driving simulation with procedural or recorded traffic")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "3600")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.016666668")]
    delta: f32,

    /// Seed for reproducible procedural traffic
    #[arg(long)]
    seed: Option<u64>,

    /// Replay traffic from a trajectory CSV instead of generating it
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Scale detector coordinates (x2, y5) when loading the replay file
    #[arg(long)]
    detector_coordinates: bool,

    /// Vehicles per lane in procedural mode
    #[arg(long)]
    vehicles_per_lane: Option<usize>,

    /// Player speed level, 0-9
    #[arg(long, default_value = "5")]
    speed_level: u8,

    /// Steer back and forth instead of driving straight
    #[arg(long)]
    weave: bool,

    /// Append newly raised warnings to this CSV file
    #[arg(long)]
    warnings_log: Option<PathBuf>,

    /// Start with traffic disabled
    #[arg(long)]
    traffic_off: bool,

    /// Write a synthetic trajectory CSV to this path and exit
    #[arg(long)]
    generate: Option<PathBuf>,

    /// Data frames to record with --generate
    #[arg(long, default_value = "2000")]
    generate_frames: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = SimulationConfig::default();
    if let Some(vehicles_per_lane) = cli.vehicles_per_lane {
        config.traffic_density = vehicles_per_lane;
    }

    if let Some(path) = &cli.generate {
        let options = GeneratorOptions {
            frames: cli.generate_frames,
            vehicles_per_lane: cli
                .vehicles_per_lane
                .unwrap_or(GeneratorOptions::default().vehicles_per_lane),
            ..GeneratorOptions::default()
        };
        generate_trajectory_file(path, &config, &options, cli.seed)?;
        return Ok(());
    }

    let mut world = match &cli.replay {
        Some(path) => {
            let mapping = if cli.detector_coordinates {
                CoordinateMapping::DETECTOR
            } else {
                CoordinateMapping::IDENTITY
            };
            let table = TrajectoryTable::load_or_empty(path, &config.world_frame(), mapping);
            SimWorld::new_replay(config, Arc::new(table))?
        }
        None => match cli.seed {
            Some(seed) => SimWorld::new_procedural_with_seed(config, seed)?,
            None => SimWorld::new_procedural(config)?,
        },
    };

    if let Some(path) = &cli.warnings_log {
        world.attach_warning_log(WarningLog::create(path)?);
    }
    if !cli.traffic_off {
        world.toggle_traffic();
    }

    info!("Running driving simulation in headless mode...");
    info!("Ticks: {}, Delta: {}s", cli.ticks, cli.delta);

    let ticks_per_second = (1.0 / cli.delta).ceil().max(1.0) as u32;
    for tick in 0..cli.ticks {
        let controls = PlayerControls {
            speed_level: Some(cli.speed_level),
            brake: false,
            steer: if cli.weave { weave_steer(tick, ticks_per_second) } else { 0 },
        };
        let report = world.tick(&controls, cli.delta);

        for event in &report.assessment.events {
            debug!(
                "{:.2}s {}: {}",
                event.timestamp,
                event.warning_type.as_str(),
                event.message
            );
        }
        if (tick + 1) % ticks_per_second == 0 {
            debug!(
                "--- After tick {} ({:.1}s simulated time) --- {}",
                tick + 1,
                world.time,
                world.traffic.debug_info(world.player.world_y)
            );
        }
    }

    world.print_summary();
    world.log_statistics();
    Ok(())
}

/// Steering pattern that swings the heading left and right every two seconds
fn weave_steer(tick: u32, ticks_per_second: u32) -> i8 {
    match (tick / ticks_per_second) % 4 {
        0 | 3 => 1,
        _ => -1,
    }
}
