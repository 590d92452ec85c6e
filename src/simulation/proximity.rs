//! Proximity, collision, swerve and speed classification
//!
//! Every tick the monitor classifies the player's situation and reports
//! which warnings are active. Events are only emitted on the tick a warning
//! type becomes active; a warning that stays active is not re-emitted until
//! it clears and triggers again.

use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashMap};

use super::config::SimulationConfig;
use super::types::{planar_distance, PlayerState, VehicleId};
use super::vehicle::VehicleSnapshot;
use super::warnings::{WarningEvent, WarningType};

/// Distance risk for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Safe,
    Proximity,
    Collision,
}

/// Lateral swerve detection state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwerveState {
    Stable,
    /// Sustained lateral movement since `start_time`, not yet long enough
    Active { start_time: f64 },
    Swerving,
}

/// Debounced lateral-movement state machine
///
/// * `Stable` moves to `Active` on the first tick with |dx| above the
///   movement threshold.
/// * `Active` escalates to `Swerving` on a moving tick once the movement
///   has lasted longer than the time threshold.
/// * `Active` or `Swerving` return to `Stable` after `stable_ticks_required`
///   consecutive ticks at or below the threshold.
#[derive(Debug, Clone)]
pub struct SwerveDetector {
    movement_threshold: f32,
    time_threshold: f64,
    stable_ticks_required: u32,
    state: SwerveState,
    stable_ticks: u32,
    last_x: Option<f32>,
}

impl SwerveDetector {
    pub fn new(movement_threshold: f32, time_threshold: f32, stable_ticks_required: u32) -> Self {
        Self {
            movement_threshold,
            time_threshold: time_threshold as f64,
            stable_ticks_required,
            state: SwerveState::Stable,
            stable_ticks: 0,
            last_x: None,
        }
    }

    pub fn state(&self) -> SwerveState {
        self.state
    }

    pub fn is_swerving(&self) -> bool {
        self.state == SwerveState::Swerving
    }

    /// Feed the player's lateral position at time `now`
    pub fn update(&mut self, x: f32, now: f64) -> SwerveState {
        let dx = self.last_x.map(|last| (x - last).abs()).unwrap_or(0.0);
        self.last_x = Some(x);
        let moving = dx > self.movement_threshold;

        self.state = match self.state {
            SwerveState::Stable if moving => {
                self.stable_ticks = 0;
                SwerveState::Active { start_time: now }
            }
            SwerveState::Stable => SwerveState::Stable,
            SwerveState::Active { start_time } if moving => {
                self.stable_ticks = 0;
                if now - start_time > self.time_threshold {
                    SwerveState::Swerving
                } else {
                    SwerveState::Active { start_time }
                }
            }
            SwerveState::Swerving if moving => {
                self.stable_ticks = 0;
                SwerveState::Swerving
            }
            state => {
                self.stable_ticks += 1;
                if self.stable_ticks >= self.stable_ticks_required {
                    self.stable_ticks = 0;
                    SwerveState::Stable
                } else {
                    state
                }
            }
        };
        self.state
    }
}

/// Outcome of one monitor evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub timestamp: f64,
    pub risk: RiskLevel,
    /// Distance to the vehicle that decided the risk level
    pub nearest_distance: Option<f32>,
    pub nearest_vehicle: Option<VehicleId>,
    pub swerve: SwerveState,
    /// Every warning active this tick, including sustained ones
    pub active: Vec<WarningType>,
    /// Warnings that became active this tick
    pub events: Vec<WarningEvent>,
}

impl Assessment {
    pub fn is_active(&self, warning_type: WarningType) -> bool {
        self.active.contains(&warning_type)
    }

    pub fn raised(&self, warning_type: WarningType) -> bool {
        self.events.iter().any(|e| e.warning_type == warning_type)
    }
}

pub struct ProximityMonitor {
    proximity_distance: f32,
    collision_distance: f32,
    stopped_speed: f32,
    slow_speed: f32,
    overspeed_speed: f32,
    swerve: SwerveDetector,
    previously_active: BTreeSet<WarningType>,
    /// Session time in seconds
    time: f64,
    raised_counts: HashMap<WarningType, usize>,
}

impl ProximityMonitor {
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        config.validate().context("Invalid proximity configuration")?;
        Ok(Self {
            proximity_distance: config.proximity_distance,
            collision_distance: config.collision_distance,
            stopped_speed: config.stopped_speed,
            slow_speed: config.slow_speed,
            overspeed_speed: config.overspeed_speed,
            swerve: SwerveDetector::new(
                config.swerve_movement_threshold,
                config.swerve_time_threshold,
                config.swerve_stable_ticks,
            ),
            previously_active: BTreeSet::new(),
            time: 0.0,
            raised_counts: HashMap::new(),
        })
    }

    /// Session time in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of times each warning type has been raised
    pub fn raised_count(&self, warning_type: WarningType) -> usize {
        self.raised_counts.get(&warning_type).copied().unwrap_or(0)
    }

    pub fn total_raised(&self) -> usize {
        self.raised_counts.values().sum()
    }

    /// Distance risk of the player against every vehicle
    ///
    /// The first vehicle inside the collision distance decides the result;
    /// otherwise the nearest vehicle is compared with the proximity distance.
    pub fn classify_risk(
        &self,
        player_x: f32,
        player_y: f64,
        vehicles: &[VehicleSnapshot],
    ) -> (RiskLevel, Option<f32>, Option<VehicleId>) {
        let mut nearest: Option<(f32, VehicleId)> = None;

        for vehicle in vehicles {
            let distance = planar_distance(player_x, player_y, vehicle.x, vehicle.world_y);
            if distance < self.collision_distance {
                return (RiskLevel::Collision, Some(distance), Some(vehicle.id));
            }
            if nearest.map_or(true, |(best, _)| distance < best) {
                nearest = Some((distance, vehicle.id));
            }
        }

        match nearest {
            Some((distance, id)) if distance < self.proximity_distance => {
                (RiskLevel::Proximity, Some(distance), Some(id))
            }
            Some((distance, id)) => (RiskLevel::Safe, Some(distance), Some(id)),
            None => (RiskLevel::Safe, None, None),
        }
    }

    fn speed_warnings(&self, speed: f32, active: &mut Vec<WarningType>) {
        if speed < self.stopped_speed {
            active.push(WarningType::Stopped);
        } else if speed < self.slow_speed {
            active.push(WarningType::SlowDriving);
        }
        if speed > self.overspeed_speed {
            active.push(WarningType::Overspeeding);
        }
    }

    /// Classify this tick and emit newly raised warnings
    pub fn evaluate(
        &mut self,
        player: &PlayerState,
        vehicles: &[VehicleSnapshot],
        delta_secs: f32,
    ) -> Assessment {
        self.time += delta_secs as f64;
        let now = self.time;

        let (risk, nearest_distance, nearest_vehicle) =
            self.classify_risk(player.x, player.world_y, vehicles);
        let swerve = self.swerve.update(player.x, now);

        let mut active = Vec::new();
        match risk {
            RiskLevel::Collision => active.push(WarningType::Collision),
            RiskLevel::Proximity => active.push(WarningType::Proximity),
            RiskLevel::Safe => {}
        }
        if swerve == SwerveState::Swerving {
            active.push(WarningType::Swerving);
        }
        self.speed_warnings(player.speed, &mut active);

        let events: Vec<WarningEvent> = active
            .iter()
            .filter(|&&t| !self.previously_active.contains(&t))
            .map(|&t| WarningEvent::new(now, t, player))
            .collect();
        for event in &events {
            *self.raised_counts.entry(event.warning_type).or_insert(0) += 1;
        }
        self.previously_active = active.iter().copied().collect();

        Assessment {
            timestamp: now,
            risk,
            nearest_distance,
            nearest_vehicle,
            swerve,
            active,
            events,
        }
    }
}
