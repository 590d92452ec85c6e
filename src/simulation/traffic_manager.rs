//! Vehicle spawning, overlap resolution and recycling
//!
//! Free functions over the vehicle pool, kept apart from the engine's
//! per-tick coordination.

use log::{debug, warn};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::config::SimulationConfig;
use super::replay::TrajectoryTable;
use super::traffic_source::TrafficMode;
use super::types::{PlayerState, VehicleId};
use super::vehicle::Vehicle;

/// Vehicles sharing a sampled base speed at initial placement
const SPEED_CLUSTER_SIZE: usize = 5;

/// Sample a fresh traffic speed from the configured range
pub fn sample_speed(config: &SimulationConfig, rng: &mut StdRng) -> f32 {
    let (low, high) = config.traffic_speed_range;
    rng.random_range(low..=high)
}

/// Populate a procedural pool around the player
///
/// Each lane draws from a shuffled set of evenly spaced candidate offsets,
/// so lanes are not visually synchronised and no two vehicles in a lane
/// start closer than `initial_spacing`. Speeds are clustered: every few
/// vehicles share a base speed with a small spread.
pub fn spawn_procedural_pool(
    config: &SimulationConfig,
    vehicles_per_lane: usize,
    player_world_y: f64,
    rng: &mut StdRng,
) -> Vec<Vehicle> {
    let frame = config.world_frame();
    let behind = config.initial_slots_behind as i64;
    let ahead = config.initial_slots_ahead as i64;
    let slot_count = (behind + ahead) as usize;

    if vehicles_per_lane > slot_count {
        warn!(
            "Requested {} vehicles per lane but only {} spawn slots exist; capping",
            vehicles_per_lane, slot_count
        );
    }
    let per_lane = vehicles_per_lane.min(slot_count);

    let mut vehicles = Vec::with_capacity(per_lane * config.lane_count);
    for lane in 0..config.lane_count {
        let mut offsets: Vec<f64> = (-behind..ahead)
            .map(|i| player_world_y + i as f64 * config.initial_spacing as f64)
            .collect();
        offsets.shuffle(rng);

        let mut base_speed = sample_speed(config, rng);
        for (i, world_y) in offsets.into_iter().take(per_lane).enumerate() {
            if i % SPEED_CLUSTER_SIZE == 0 {
                base_speed = sample_speed(config, rng);
            }
            let spread = config.speed_cluster_jitter;
            let speed = (base_speed + rng.random_range(-spread..=spread))
                .clamp(config.min_speed, config.max_speed);
            let id = VehicleId(vehicles.len());
            vehicles.push(Vehicle::new(id, &frame, lane, world_y, speed));
        }
    }

    debug!(
        "Spawned {} procedural vehicles across {} lanes",
        vehicles.len(),
        config.lane_count
    );
    vehicles
}

/// Populate a replay pool with one vehicle per recorded id
///
/// Vehicles start at their first recorded world-Y relative to the player,
/// or evenly spaced when the recording has no forward position.
pub fn spawn_replay_pool(
    config: &SimulationConfig,
    table: &TrajectoryTable,
    player_world_y: f64,
) -> Vec<Vehicle> {
    let frame = config.world_frame();
    let (low, high) = config.traffic_speed_range;
    let fallback_speed = (low + high) / 2.0;

    table
        .first_records()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let x = record
                .world_x
                .filter(|x| x.is_finite())
                .unwrap_or_else(|| frame.lane_center(index % config.lane_count));
            let offset = record
                .world_y
                .filter(|y| y.is_finite())
                .unwrap_or(index as f64 * config.initial_spacing as f64);
            let speed = record
                .speed
                .filter(|s| s.is_finite())
                .unwrap_or(fallback_speed)
                .clamp(config.min_speed, config.max_speed);

            let mut vehicle =
                Vehicle::at_x(VehicleId(index), &frame, x, player_world_y + offset, speed);
            vehicle.recorded_id = Some(record.vehicle_id);
            vehicle.action = record.action;
            vehicle
        })
        .collect()
}

/// Push same-lane vehicles apart to the minimum safety gap
///
/// Each lane is sorted by world-Y and walked once from the back. When a
/// vehicle sits closer than `gap` to the one behind it, it is moved forward
/// by exactly the deficit. Returns the number of corrections made.
pub fn resolve_lane_overlaps(vehicles: &mut [Vehicle], lane_count: usize, gap: f32) -> usize {
    let gap = gap as f64;
    let mut corrections = 0;

    for lane in 0..lane_count {
        let mut lane_indices: Vec<usize> = vehicles
            .iter()
            .enumerate()
            .filter(|(_, v)| v.lane == lane)
            .map(|(i, _)| i)
            .collect();
        lane_indices.sort_by_key(|&i| OrderedFloat(vehicles[i].world_y));

        for pair in lane_indices.windows(2) {
            let previous = vehicles[pair[0]].world_y;
            let current = &mut vehicles[pair[1]];
            if current.world_y - previous < gap {
                current.world_y = previous + gap;
                corrections += 1;
            }
        }
    }

    corrections
}

/// Lowest world-Y at or above `candidate` keeping `gap` from every other
/// vehicle in the lane
pub fn find_clear_slot(
    vehicles: &[Vehicle],
    skip: usize,
    lane: usize,
    candidate: f64,
    gap: f32,
) -> f64 {
    let gap = gap as f64;
    let mut positions: Vec<OrderedFloat<f64>> = vehicles
        .iter()
        .enumerate()
        .filter(|&(i, v)| i != skip && v.lane == lane)
        .map(|(_, v)| OrderedFloat(v.world_y))
        .collect();
    positions.sort();

    let mut world_y = candidate;
    for position in positions {
        let position = position.into_inner();
        if position >= world_y + gap {
            break;
        }
        if (world_y - position).abs() < gap {
            world_y = position + gap;
        }
    }
    world_y
}

/// Recycle vehicles that left the relevant window around the player
///
/// Procedural vehicles that fall behind reappear `spawn_distance` ahead of
/// the player (moved further out if that spot is taken) with a fresh speed.
/// Replay vehicles that fall behind reappear above the furthest vehicle in
/// the pool, no closer than `spawn_distance` and no further than the
/// forward bound `spawn_distance + replay_recycle_offset`. Replay vehicles
/// that run past the forward bound reappear behind the player, half the
/// despawn distance back. Replay vehicles keep their recorded target speed
/// so playback stays deterministic. Returns the number of vehicles recycled.
pub fn recycle_vehicles(
    vehicles: &mut [Vehicle],
    mode: TrafficMode,
    config: &SimulationConfig,
    player: &PlayerState,
    rng: &mut StdRng,
) -> usize {
    let despawn_line = player.world_y - config.despawn_distance as f64;
    let spawn_line = player.world_y + config.spawn_distance as f64;
    let forward_bound = spawn_line + config.replay_recycle_offset as f64;
    let mut recycled = 0;

    for index in 0..vehicles.len() {
        let world_y = vehicles[index].world_y;
        let behind = world_y < despawn_line;
        let escaped = mode == TrafficMode::Replay && world_y > forward_bound;
        if !behind && !escaped {
            continue;
        }

        let lane = vehicles[index].lane;
        let (world_y, speed) = match mode {
            TrafficMode::Procedural => {
                let world_y =
                    find_clear_slot(vehicles, index, lane, spawn_line, config.minimum_safety_gap);
                (world_y, sample_speed(config, rng))
            }
            TrafficMode::Replay => {
                let world_y = if behind {
                    let furthest = vehicles
                        .iter()
                        .enumerate()
                        .filter(|&(i, _)| i != index)
                        .map(|(_, v)| OrderedFloat(v.world_y))
                        .max()
                        .map(OrderedFloat::into_inner);
                    furthest
                        .map(|y| y + config.replay_recycle_offset as f64)
                        .unwrap_or(spawn_line)
                        .clamp(spawn_line, forward_bound)
                } else {
                    let candidate = player.world_y - config.despawn_distance as f64 / 2.0;
                    find_clear_slot(vehicles, index, lane, candidate, config.minimum_safety_gap)
                };
                let speed = vehicles[index]
                    .target_speed
                    .clamp(config.min_speed, config.max_speed);
                (world_y, speed)
            }
        };

        let vehicle = &mut vehicles[index];
        debug!(
            "Recycling vehicle {:?} from {:.1} to {:.1}",
            vehicle.id, vehicle.world_y, world_y
        );
        vehicle.recycle(world_y, speed);
        recycled += 1;
    }

    recycled
}
