//! Synthetic trajectory recordings
//!
//! Runs procedural traffic in absolute world coordinates, with no player
//! frame, and records every vehicle once per data frame. The output uses the
//! `frame_id, vehicle_id, world_x, world_y, speed, action` layout that
//! `TrajectoryTable` reads back for replay.

use anyhow::{ensure, Context, Result};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::config::SimulationConfig;
use super::engine::apply_source_update;
use super::replay::TrajectoryRecord;
use super::traffic_manager::{resolve_lane_overlaps, spawn_procedural_pool};
use super::traffic_source::ProceduralSource;
use super::types::PlayerState;
use super::vehicle::MotionStep;

/// Shape of a generated recording
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorOptions {
    pub frames: u32,
    pub vehicles_per_lane: usize,
    /// Simulated seconds between recorded frames
    pub frame_secs: f32,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            frames: 2000,
            vehicles_per_lane: 2,
            // One data frame per ten ticks at 60 Hz
            frame_secs: 10.0 / 60.0,
        }
    }
}

#[derive(Serialize)]
struct TrajectoryRow<'a> {
    frame_id: u32,
    vehicle_id: u32,
    world_x: Option<f32>,
    world_y: Option<f64>,
    speed: Option<f32>,
    action: &'a str,
}

/// Record procedural traffic for `options.frames` frames
///
/// Records are ordered by frame, then vehicle id. The same config, options
/// and seed always produce the same records.
pub fn generate_trajectories(
    config: &SimulationConfig,
    options: &GeneratorOptions,
    rng: &mut StdRng,
) -> Result<Vec<TrajectoryRecord>> {
    config.validate().context("Invalid generator configuration")?;
    ensure!(
        options.frame_secs.is_finite() && options.frame_secs > 0.0,
        "frame_secs must be positive, got {}",
        options.frame_secs
    );

    let frame = config.world_frame();
    let source = ProceduralSource::new(config);
    let mut vehicles = spawn_procedural_pool(config, options.vehicles_per_lane, 0.0, rng);

    // Stationary and off the road: vehicles move by their own speed and
    // never blend toward it
    let observer = PlayerState::new(-frame.lane_width, frame.lane_count, 0.0, 0.0);
    let step = MotionStep {
        delta_secs: options.frame_secs,
        frame_shift: 0.0,
        smoothing_factor: config.smoothing.factor(options.frame_secs),
        lane_change_step: config.lane_change_step,
        min_speed: config.min_speed,
        max_speed: config.max_speed,
    };

    let mut records = Vec::with_capacity(vehicles.len() * options.frames as usize);
    for frame_id in 0..options.frames {
        if frame_id > 0 {
            for vehicle in vehicles.iter_mut() {
                let update = source.step(vehicle, &observer, rng);
                apply_source_update(vehicle, &frame, update);
                vehicle.advance(&observer, &step);
            }
            resolve_lane_overlaps(&mut vehicles, frame.lane_count, config.minimum_safety_gap);
        }

        for vehicle in &vehicles {
            let vehicle_id = u32::try_from(vehicle.id.0)
                .with_context(|| format!("Vehicle id {} does not fit a recording", vehicle.id.0))?;
            records.push(TrajectoryRecord {
                frame: frame_id,
                vehicle_id,
                world_x: Some(vehicle.x),
                world_y: Some(vehicle.world_y),
                speed: Some(vehicle.speed),
                action: vehicle.action,
            });
        }
    }

    Ok(records)
}

/// Write records as trajectory CSV
pub fn write_trajectories<W: Write>(records: &[TrajectoryRecord], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer
            .serialize(TrajectoryRow {
                frame_id: record.frame,
                vehicle_id: record.vehicle_id,
                world_x: record.world_x,
                world_y: record.world_y,
                speed: record.speed,
                action: record.action.as_str(),
            })
            .context("Failed to write trajectory row")?;
    }
    writer.flush().context("Failed to flush trajectory rows")?;
    Ok(())
}

/// Generate a recording and write it to `path`, returning the row count
///
/// Without a seed the RNG is seeded from the OS.
pub fn generate_trajectory_file<P: AsRef<Path>>(
    path: P,
    config: &SimulationConfig,
    options: &GeneratorOptions,
    seed: Option<u64>,
) -> Result<usize> {
    let path = path.as_ref();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let records = generate_trajectories(config, options, &mut rng)?;

    let file = File::create(path)
        .with_context(|| format!("Failed to create trajectory file {}", path.display()))?;
    write_trajectories(&records, file)
        .with_context(|| format!("Failed to write trajectory file {}", path.display()))?;

    info!(
        "Generated {} trajectory rows over {} frames into {}",
        records.len(),
        options.frames,
        path.display()
    );
    Ok(records.len())
}
