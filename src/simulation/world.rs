//! Main simulation world that ties everything together
//!
//! Each tick runs player kinematics, then the traffic engine, then the
//! proximity monitor, all synchronously.

use anyhow::{Context, Result};
use log::{info, warn};
use std::fs::File;
use std::sync::Arc;

use super::config::SimulationConfig;
use super::engine::{EngineTick, TrafficEngine};
use super::player::{PlayerControls, PlayerKinematics};
use super::proximity::{Assessment, ProximityMonitor, RiskLevel};
use super::replay::TrajectoryTable;
use super::warnings::{WarningLog, WarningType};

/// What one world tick produced
#[derive(Debug, Clone)]
pub struct TickReport {
    pub traffic: EngineTick,
    pub assessment: Assessment,
}

/// The main simulation world
pub struct SimWorld {
    config: SimulationConfig,

    /// The player's car
    pub player: PlayerKinematics,

    /// Traffic around the player
    pub traffic: TrafficEngine,

    /// Risk and warning classification
    pub monitor: ProximityMonitor,

    /// Optional CSV sink for newly raised warnings
    warning_log: Option<WarningLog<File>>,

    /// Simulation time
    pub time: f64,

    pub ticks: u64,

    /// Ticks that ended in a collision
    pub collision_ticks: u64,
}

impl SimWorld {
    /// Build a world around an existing traffic engine
    pub fn new(config: SimulationConfig, traffic: TrafficEngine) -> Result<Self> {
        config.validate().context("Invalid simulation configuration")?;
        Ok(Self {
            player: PlayerKinematics::new(&config)?,
            monitor: ProximityMonitor::new(&config)?,
            traffic,
            config,
            warning_log: None,
            time: 0.0,
            ticks: 0,
            collision_ticks: 0,
        })
    }

    pub fn new_procedural(config: SimulationConfig) -> Result<Self> {
        let traffic = TrafficEngine::procedural(config.clone())?;
        Self::new(config, traffic)
    }

    /// Create a procedural world with a seeded RNG for reproducible traffic
    pub fn new_procedural_with_seed(config: SimulationConfig, seed: u64) -> Result<Self> {
        let traffic = TrafficEngine::procedural_with_seed(config.clone(), seed)?;
        Self::new(config, traffic)
    }

    pub fn new_replay(config: SimulationConfig, table: Arc<TrajectoryTable>) -> Result<Self> {
        let traffic = TrafficEngine::replay(config.clone(), table)?;
        Self::new(config, traffic)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn attach_warning_log(&mut self, log: WarningLog<File>) {
        self.warning_log = Some(log);
    }

    pub fn warning_log(&self) -> Option<&WarningLog<File>> {
        self.warning_log.as_ref()
    }

    pub fn toggle_traffic(&mut self) -> bool {
        self.traffic.toggle()
    }

    /// Main simulation tick
    pub fn tick(&mut self, controls: &PlayerControls, delta_secs: f32) -> TickReport {
        self.time += delta_secs as f64;
        self.ticks += 1;

        self.player.apply_controls(controls, delta_secs);
        self.player.update(delta_secs);
        let player_state = self.player.state();

        let traffic = self.traffic.update(&player_state, delta_secs);
        let vehicles = self.traffic.vehicles_snapshot();
        let assessment = self.monitor.evaluate(&player_state, &vehicles, delta_secs);

        if assessment.risk == RiskLevel::Collision {
            self.collision_ticks += 1;
            if self.config.stop_on_collision && assessment.raised(WarningType::Collision) {
                info!(
                    "Collision at {:.1}s with vehicle {:?}, stopping player",
                    self.time, assessment.nearest_vehicle
                );
                self.player.stop();
            }
        }

        if let Some(log) = &mut self.warning_log {
            if let Err(e) = log.append_all(&assessment.events) {
                // Feedback logging must never halt the simulation
                warn!("Disabling warning log: {:#}", e);
                self.warning_log = None;
            }
        }

        TickReport { traffic, assessment }
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        let player = self.player.state();
        println!("=== Driving Simulation Summary ===");
        println!("Time: {:.2}s", self.time);
        println!(
            "Player: lane={}, x={:.1}, world_y={:.1}, speed={:.1}",
            player.lane, player.x, player.world_y, player.speed
        );
        println!("{}", self.traffic.debug_info(player.world_y));

        let vehicles = self.traffic.vehicles_snapshot();
        if !vehicles.is_empty() {
            println!("--- Nearby Traffic ---");
            for vehicle in vehicles
                .iter()
                .filter(|v| v.relative_y.abs() < self.config.despawn_distance)
            {
                println!(
                    "  Vehicle {:?}: lane={}, relative_y={:.1}, speed={:.1}, action={}",
                    vehicle.id.0,
                    vehicle.lane,
                    vehicle.relative_y,
                    vehicle.speed,
                    vehicle.action.as_str()
                );
            }
        }

        println!("--- Warnings Raised ---");
        for warning_type in WarningType::ALL {
            println!(
                "  {}: {}",
                warning_type.as_str(),
                self.monitor.raised_count(warning_type)
            );
        }
    }

    /// Log end-of-run statistics
    pub fn log_statistics(&self) {
        let stats = self.traffic.stats();
        info!("=== SIMULATION COMPLETE ===");
        info!("Total ticks: {}", self.ticks);
        info!("Simulated time: {:.1}s", self.time);
        info!("Traffic mode: {}", self.traffic.mode().as_str());
        info!("Vehicles in pool: {}", self.traffic.vehicles().len());
        info!("Total vehicles recycled: {}", stats.recycled);
        info!("Overlap corrections: {}", stats.overlap_corrections);
        info!("Skipped vehicle updates: {}", stats.skipped_updates);
        info!("Distance travelled: {:.1}", self.player.world_y);
        info!("Warnings raised: {}", self.monitor.total_raised());
        info!("Collisions: {}", self.monitor.raised_count(WarningType::Collision));
        if let Some(log) = &self.warning_log {
            info!("Warning log rows: {}", log.rows_written());
        }
    }
}
