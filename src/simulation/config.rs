//! Simulation configuration
//!
//! A single immutable set of named scalar options. Each component clones the
//! config it was built with; nothing reads configuration from globals.

use anyhow::{ensure, Result};

use super::types::WorldFrame;

/// How a vehicle's speed approaches its target speed each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedSmoothing {
    /// Fixed fraction of the remaining difference per tick.
    /// Behaviour depends on the tick rate.
    PerTick(f32),
    /// Time-scaled exponential decay: fraction `1 - exp(-rate * dt)`
    Exponential { rate: f32 },
}

impl SpeedSmoothing {
    /// Fraction of the gap to the target covered this tick
    pub fn factor(&self, delta_secs: f32) -> f32 {
        match *self {
            SpeedSmoothing::PerTick(factor) => factor,
            SpeedSmoothing::Exponential { rate } => 1.0 - (-rate * delta_secs).exp(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    // Road
    pub lane_count: usize,
    pub lane_width: f32,

    // Traffic speeds
    /// Hard clamp applied to every traffic vehicle after each update
    pub min_speed: f32,
    pub max_speed: f32,
    /// Range fresh vehicle speeds are sampled from
    pub traffic_speed_range: (f32, f32),
    /// Random spread added around a sampled base speed at spawn
    pub speed_cluster_jitter: f32,

    // Pool and recycling
    /// Vehicles per lane in procedural mode
    pub traffic_density: usize,
    /// Spacing between candidate slots for initial placement
    pub initial_spacing: f32,
    /// Candidate slots behind and ahead of the player for initial placement
    pub initial_slots_behind: usize,
    pub initial_slots_ahead: usize,
    pub spawn_distance: f32,
    pub despawn_distance: f32,
    pub minimum_safety_gap: f32,
    /// Distance above the furthest vehicle a replay vehicle is recycled to
    pub replay_recycle_offset: f32,

    // Procedural behaviour
    pub lane_change_probability: f64,
    pub speed_change_probability: f64,
    /// Maximum magnitude of a random target speed perturbation
    pub speed_jitter: f32,
    /// Fraction a same-lane vehicle's target blends toward the player's speed
    pub follow_blend: f32,
    pub smoothing: SpeedSmoothing,
    /// Lane-change progress added per tick
    pub lane_change_step: f32,

    // Replay
    /// Engine ticks per recorded data frame (10 ticks = 0.1 frames per tick)
    pub replay_ticks_per_frame: u32,

    // Proximity and swerve
    pub swerve_movement_threshold: f32,
    pub swerve_time_threshold: f32,
    /// Consecutive stable ticks needed to clear a swerve
    pub swerve_stable_ticks: u32,
    pub proximity_distance: f32,
    pub collision_distance: f32,

    // Speed feedback
    pub stopped_speed: f32,
    pub slow_speed: f32,
    pub overspeed_speed: f32,

    // Player
    pub player_max_speed: f32,
    pub acceleration_rate: f32,
    pub brake_multiplier: f32,
    /// Heading change in degrees per tick at full speed
    pub turning_speed: f32,
    pub max_heading: f32,
    /// Half the player's width, keeps the car on the road surface
    pub player_half_width: f32,
    pub stop_on_collision: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let lane_width = 260.0;
        Self {
            lane_count: 4,
            lane_width,

            min_speed: 50.0,
            max_speed: 300.0,
            traffic_speed_range: (120.0, 220.0),
            speed_cluster_jitter: 8.0,

            traffic_density: 8,
            initial_spacing: 80.0,
            initial_slots_behind: 25,
            initial_slots_ahead: 50,
            spawn_distance: 4000.0,
            despawn_distance: 2000.0,
            minimum_safety_gap: 50.0,
            replay_recycle_offset: 200.0,

            lane_change_probability: 0.002,
            speed_change_probability: 0.05,
            speed_jitter: 5.0,
            follow_blend: 0.1,
            smoothing: SpeedSmoothing::PerTick(0.02),
            lane_change_step: 0.05,

            replay_ticks_per_frame: 10,

            swerve_movement_threshold: 2.0,
            swerve_time_threshold: 0.5,
            swerve_stable_ticks: 10,
            proximity_distance: 250.0,
            collision_distance: 100.0,

            stopped_speed: 1.0,
            slow_speed: 150.0,
            overspeed_speed: 250.0,

            player_max_speed: 370.0,
            acceleration_rate: 70.0,
            brake_multiplier: 4.0,
            turning_speed: 5.0,
            max_heading: 45.0,
            player_half_width: lane_width * 0.55 / 2.0,
            stop_on_collision: true,
        }
    }
}

impl SimulationConfig {
    pub fn world_frame(&self) -> WorldFrame {
        WorldFrame::new(self.lane_count, self.lane_width)
    }

    /// Check the configuration for programmer errors
    ///
    /// Returns a descriptive error for the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.lane_count > 0, "lane_count must be at least 1");
        ensure!(
            self.lane_width.is_finite() && self.lane_width > 0.0,
            "lane_width must be positive, got {}",
            self.lane_width
        );
        ensure!(
            self.min_speed >= 0.0 && self.min_speed <= self.max_speed,
            "speed bounds must satisfy 0 <= min_speed <= max_speed, got [{}, {}]",
            self.min_speed,
            self.max_speed
        );
        let (low, high) = self.traffic_speed_range;
        ensure!(
            low <= high && low >= self.min_speed && high <= self.max_speed,
            "traffic_speed_range ({}, {}) must lie within [{}, {}]",
            low,
            high,
            self.min_speed,
            self.max_speed
        );
        ensure!(
            self.speed_cluster_jitter >= 0.0 && self.speed_jitter >= 0.0,
            "speed jitter values must not be negative"
        );
        ensure!(
            self.spawn_distance > self.despawn_distance,
            "spawn_distance ({}) must exceed despawn_distance ({})",
            self.spawn_distance,
            self.despawn_distance
        );
        ensure!(
            self.despawn_distance >= 0.0,
            "despawn_distance must not be negative"
        );
        ensure!(
            self.minimum_safety_gap >= 0.0,
            "minimum_safety_gap must not be negative"
        );
        ensure!(
            self.initial_spacing >= self.minimum_safety_gap,
            "initial_spacing ({}) must be at least minimum_safety_gap ({})",
            self.initial_spacing,
            self.minimum_safety_gap
        );
        ensure!(
            self.replay_recycle_offset >= self.minimum_safety_gap,
            "replay_recycle_offset ({}) must be at least minimum_safety_gap ({})",
            self.replay_recycle_offset,
            self.minimum_safety_gap
        );
        ensure!(
            (0.0..=1.0).contains(&self.lane_change_probability)
                && (0.0..=1.0).contains(&self.speed_change_probability),
            "probabilities must lie within [0, 1]"
        );
        ensure!(
            (0.0..=1.0).contains(&self.follow_blend),
            "follow_blend must lie within [0, 1]"
        );
        match self.smoothing {
            SpeedSmoothing::PerTick(factor) => ensure!(
                factor > 0.0 && factor <= 1.0,
                "per-tick smoothing factor must lie within (0, 1], got {}",
                factor
            ),
            SpeedSmoothing::Exponential { rate } => ensure!(
                rate > 0.0,
                "exponential smoothing rate must be positive, got {}",
                rate
            ),
        }
        ensure!(
            self.lane_change_step > 0.0 && self.lane_change_step <= 1.0,
            "lane_change_step must lie within (0, 1]"
        );
        ensure!(
            self.replay_ticks_per_frame > 0,
            "replay_ticks_per_frame must be at least 1"
        );
        ensure!(
            self.swerve_movement_threshold >= 0.0 && self.swerve_time_threshold >= 0.0,
            "swerve thresholds must not be negative"
        );
        ensure!(
            self.collision_distance >= 0.0 && self.collision_distance <= self.proximity_distance,
            "collision_distance ({}) must not exceed proximity_distance ({})",
            self.collision_distance,
            self.proximity_distance
        );
        ensure!(
            self.stopped_speed <= self.slow_speed && self.slow_speed <= self.overspeed_speed,
            "speed warning thresholds must be ordered stopped <= slow <= overspeed"
        );
        ensure!(
            self.player_max_speed > 0.0 && self.acceleration_rate > 0.0,
            "player_max_speed and acceleration_rate must be positive"
        );
        ensure!(
            self.brake_multiplier >= 1.0,
            "brake_multiplier must be at least 1"
        );
        ensure!(
            self.max_heading >= 0.0 && self.max_heading < 90.0,
            "max_heading must lie within [0, 90) degrees"
        );
        ensure!(
            self.player_half_width >= 0.0
                && self.player_half_width * 2.0 <= self.world_frame().road_width(),
            "player does not fit on the road"
        );
        Ok(())
    }
}
