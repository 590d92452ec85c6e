//! The traffic engine
//!
//! Owns the bounded vehicle pool and runs one tick in three phases:
//! per-vehicle source step and movement, same-lane overlap resolution,
//! then recycling. The overlap pass only starts once every vehicle has
//! moved.

use anyhow::{Context, Result};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use super::config::SimulationConfig;
use super::replay::{ReplaySource, TrajectoryTable};
use super::traffic_manager::{
    recycle_vehicles, resolve_lane_overlaps, spawn_procedural_pool, spawn_replay_pool,
};
use super::traffic_source::{ProceduralSource, SourceUpdate, TrafficMode, TrafficSource};
use super::types::{PlayerState, VehicleId, WorldFrame};
use super::vehicle::{MotionStep, Vehicle, VehicleSnapshot};

/// What happened during one engine tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineTick {
    pub recycled: usize,
    pub overlap_corrections: usize,
    /// Vehicles whose source step failed and kept their previous targets
    pub skipped_updates: usize,
}

/// Running totals across the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub ticks: u64,
    pub recycled: u64,
    pub overlap_corrections: u64,
    pub skipped_updates: u64,
}

pub struct TrafficEngine {
    config: SimulationConfig,
    frame: WorldFrame,
    source: TrafficSource,
    /// Fixed pool, indexed by `VehicleId`
    vehicles: Vec<Vehicle>,
    enabled: bool,
    /// Player world-Y at the previous tick; vehicle positions are advanced
    /// in this frame
    frame_origin: Option<f64>,
    rng: StdRng,
    stats: EngineStats,
}

impl TrafficEngine {
    fn new_internal(config: SimulationConfig, source: TrafficSource, rng: StdRng) -> Result<Self> {
        config.validate().context("Invalid traffic configuration")?;
        Ok(Self {
            frame: config.world_frame(),
            config,
            source,
            vehicles: Vec::new(),
            enabled: false,
            frame_origin: None,
            rng,
            stats: EngineStats::default(),
        })
    }

    /// Create an engine with the given source; traffic starts disabled
    pub fn new(config: SimulationConfig, source: TrafficSource) -> Result<Self> {
        Self::new_internal(config, source, StdRng::from_os_rng())
    }

    /// Create an engine with a seeded RNG for reproducible traffic
    pub fn new_with_seed(
        config: SimulationConfig,
        source: TrafficSource,
        seed: u64,
    ) -> Result<Self> {
        Self::new_internal(config, source, StdRng::seed_from_u64(seed))
    }

    pub fn procedural(config: SimulationConfig) -> Result<Self> {
        let source = TrafficSource::Procedural(ProceduralSource::new(&config));
        Self::new(config, source)
    }

    pub fn procedural_with_seed(config: SimulationConfig, seed: u64) -> Result<Self> {
        let source = TrafficSource::Procedural(ProceduralSource::new(&config));
        Self::new_with_seed(config, source, seed)
    }

    pub fn replay(config: SimulationConfig, table: Arc<TrajectoryTable>) -> Result<Self> {
        let source = TrafficSource::Replay(ReplaySource::new(table, config.replay_ticks_per_frame));
        // Replay never draws random numbers; the seed only fills the slot
        Self::new_with_seed(config, source, 0)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn mode(&self) -> TrafficMode {
        self.source.mode()
    }

    pub fn source(&self) -> &TrafficSource {
        &self.source
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Fill the pool around the player
    ///
    /// Procedural mode places `vehicles_per_lane` vehicles in every lane;
    /// replay mode places one vehicle per recorded id. Zero density or an
    /// empty trajectory table leaves the pool empty, which is a valid state.
    pub fn initialize(&mut self, vehicles_per_lane: usize, player_world_y: f64) {
        self.vehicles = match &self.source {
            TrafficSource::Procedural(_) => spawn_procedural_pool(
                &self.config,
                vehicles_per_lane,
                player_world_y,
                &mut self.rng,
            ),
            TrafficSource::Replay(replay) => {
                spawn_replay_pool(&self.config, replay.table(), player_world_y)
            }
        };
        self.frame_origin = Some(player_world_y);

        if self.vehicles.is_empty() {
            info!("Traffic pool is empty ({} mode)", self.mode().as_str());
        } else {
            info!(
                "Initialized {} vehicles across {} lanes ({} mode)",
                self.vehicles.len(),
                self.frame.lane_count,
                self.mode().as_str()
            );
        }
    }

    /// Flip traffic on or off
    ///
    /// Turning traffic on with an empty pool initializes it around the last
    /// known player position. Existing vehicles are never respawned; while
    /// disabled they keep their state and are neither updated nor exposed.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        if self.enabled && self.vehicles.is_empty() {
            let player_world_y = self.frame_origin.unwrap_or(0.0);
            self.initialize(self.config.traffic_density, player_world_y);
        }
        info!("Traffic {}", if self.enabled { "enabled" } else { "disabled" });
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.toggle();
        }
    }

    /// Advance all traffic by one tick
    pub fn update(&mut self, player: &PlayerState, delta_secs: f32) -> EngineTick {
        let frame_shift = self.frame_origin.map(|origin| player.world_y - origin).unwrap_or(0.0);
        self.frame_origin = Some(player.world_y);

        if !self.enabled {
            return EngineTick::default();
        }

        let mut tick = EngineTick::default();
        self.source.begin_tick();

        let step = MotionStep {
            delta_secs,
            frame_shift,
            smoothing_factor: self.config.smoothing.factor(delta_secs),
            lane_change_step: self.config.lane_change_step,
            min_speed: self.config.min_speed,
            max_speed: self.config.max_speed,
        };

        for vehicle in self.vehicles.iter_mut() {
            match self.source.step(vehicle, player, &mut self.rng) {
                Ok(update) => apply_source_update(vehicle, &self.frame, update),
                Err(e) => {
                    warn!("Skipping source update for vehicle {:?}: {:#}", vehicle.id, e);
                    tick.skipped_updates += 1;
                }
            }
            vehicle.advance(player, &step);
        }

        tick.overlap_corrections = resolve_lane_overlaps(
            &mut self.vehicles,
            self.frame.lane_count,
            self.config.minimum_safety_gap,
        );

        tick.recycled = recycle_vehicles(
            &mut self.vehicles,
            self.source.mode(),
            &self.config,
            player,
            &mut self.rng,
        );

        self.stats.ticks += 1;
        self.stats.recycled += tick.recycled as u64;
        self.stats.overlap_corrections += tick.overlap_corrections as u64;
        self.stats.skipped_updates += tick.skipped_updates as u64;
        tick
    }

    /// Read-only view of the traffic for rendering and proximity checks
    ///
    /// Empty while traffic is disabled.
    pub fn vehicles_snapshot(&self) -> Vec<VehicleSnapshot> {
        if !self.enabled {
            return Vec::new();
        }
        let origin = self.frame_origin.unwrap_or(0.0);
        self.vehicles.iter().map(|v| v.snapshot(origin)).collect()
    }

    /// The whole pool, regardless of whether traffic is enabled
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id.0)
    }

    pub fn vehicle_by_recorded_id(&self, recorded_id: u32) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.recorded_id == Some(recorded_id))
    }

    /// One-line status for overlays and logs
    pub fn debug_info(&self, player_world_y: f64) -> String {
        if !self.enabled {
            return "Traffic: OFF".to_string();
        }
        let nearby = self
            .vehicles
            .iter()
            .filter(|v| (v.world_y - player_world_y).abs() < self.config.despawn_distance as f64)
            .count();
        match self.source.as_replay() {
            Some(replay) => format!(
                "Traffic: ON ({}) | Vehicles: {} | Nearby: {} | Frame: {:.1}/{}",
                self.mode().as_str(),
                self.vehicles.len(),
                nearby,
                replay.clock().playback_frame(),
                replay.clock().max_frame()
            ),
            None => format!(
                "Traffic: ON ({}) | Vehicles: {} | Nearby: {}",
                self.mode().as_str(),
                self.vehicles.len(),
                nearby
            ),
        }
    }
}

pub(super) fn apply_source_update(vehicle: &mut Vehicle, frame: &WorldFrame, update: SourceUpdate) {
    if let Some(target_speed) = update.target_speed {
        vehicle.target_speed = target_speed;
    }
    if let Some(target_x) = update.target_x {
        vehicle.request_lateral_move(frame, target_x);
    }
    if let Some(lane) = update.lane_change {
        vehicle.request_lane_change(frame, lane);
    }
    if let Some(action) = update.action {
        vehicle.action = action;
    }
}
