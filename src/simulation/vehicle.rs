//! Traffic vehicle state and per-tick movement
//!
//! Vehicles never leave the pool. A vehicle that scrolls out of the relevant
//! window is recycled in place by overwriting its position and speed.

use std::str::FromStr;

use super::types::{relative_y, PlayerState, VehicleId, WorldFrame};

/// Lateral distances below this are treated as already arrived
const LATERAL_EPSILON: f32 = 0.01;

/// Advisory label carried by recorded traffic
///
/// Not consumed by the engine; kept for analytics and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrafficAction {
    #[default]
    Maintain,
    Accelerate,
    Decelerate,
    ChangeLane,
    Swerve,
    SpeedViolation,
    Unlabelled,
}

impl TrafficAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficAction::Maintain => "maintain",
            TrafficAction::Accelerate => "accelerate",
            TrafficAction::Decelerate => "decelerate",
            TrafficAction::ChangeLane => "change_lane",
            TrafficAction::Swerve => "swerve",
            TrafficAction::SpeedViolation => "speed_violation",
            TrafficAction::Unlabelled => "unlabelled",
        }
    }
}

impl FromStr for TrafficAction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "maintain" => TrafficAction::Maintain,
            "accelerate" => TrafficAction::Accelerate,
            "decelerate" | "brake" => TrafficAction::Decelerate,
            "change_lane" | "lane_change" => TrafficAction::ChangeLane,
            "swerve" => TrafficAction::Swerve,
            "speed_violation" => TrafficAction::SpeedViolation,
            _ => TrafficAction::Unlabelled,
        })
    }
}

/// Whether the vehicle was reassigned a new position on the last tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Recycled,
}

/// An in-progress lateral move (lane change or recorded drift)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateralTransition {
    pub from_x: f32,
    pub to_x: f32,
    pub target_lane: usize,
    /// Interpolation fraction in [0, 1)
    pub progress: f32,
}

/// Per-tick movement parameters shared by every vehicle
#[derive(Debug, Clone, Copy)]
pub struct MotionStep {
    pub delta_secs: f32,
    /// Forward distance the player frame moved since the last tick
    pub frame_shift: f64,
    pub smoothing_factor: f32,
    pub lane_change_step: f32,
    pub min_speed: f32,
    pub max_speed: f32,
}

/// A traffic participant
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Vehicle id from the trajectory table, replay mode only
    pub recorded_id: Option<u32>,
    /// Committed lane, switches when a lateral move completes
    pub lane: usize,
    /// Lateral world-X
    pub x: f32,
    pub target_x: f32,
    pub world_y: f64,
    pub speed: f32,
    pub target_speed: f32,
    pub lateral: Option<LateralTransition>,
    pub lifecycle: Lifecycle,
    pub action: TrafficAction,
    /// Times this slot has been recycled
    pub recycle_count: u32,
}

impl Vehicle {
    pub fn new(id: VehicleId, frame: &WorldFrame, lane: usize, world_y: f64, speed: f32) -> Self {
        let lane = frame.clamp_lane(lane as i64);
        let x = frame.lane_center(lane);
        Self {
            id,
            recorded_id: None,
            lane,
            x,
            target_x: x,
            world_y,
            speed,
            target_speed: speed,
            lateral: None,
            lifecycle: Lifecycle::Active,
            action: TrafficAction::Maintain,
            recycle_count: 0,
        }
    }

    /// Create a vehicle at an arbitrary lateral position
    pub fn at_x(id: VehicleId, frame: &WorldFrame, x: f32, world_y: f64, speed: f32) -> Self {
        let x = frame.clamp_x(x);
        let mut vehicle = Self::new(id, frame, frame.lane_at(x), world_y, speed);
        vehicle.x = x;
        vehicle.target_x = x;
        vehicle
    }

    pub fn is_changing_lane(&self) -> bool {
        self.lateral.is_some()
    }

    /// Continuous lane position, e.g. 1.5 halfway between lanes 1 and 2
    pub fn lane_position(&self, frame: &WorldFrame) -> f32 {
        self.x / frame.lane_width - 0.5
    }

    /// Start a lateral move toward `to_x`
    ///
    /// An in-progress move is replaced, starting again from the current
    /// position. Returns false when the vehicle is already headed there.
    pub fn request_lateral_move(&mut self, frame: &WorldFrame, to_x: f32) -> bool {
        let to_x = frame.clamp_x(to_x);
        if (to_x - self.target_x).abs() < LATERAL_EPSILON {
            return false;
        }
        self.target_x = to_x;
        if (to_x - self.x).abs() < LATERAL_EPSILON {
            self.lateral = None;
            self.x = to_x;
            self.lane = frame.lane_at(to_x);
            return true;
        }
        self.lateral = Some(LateralTransition {
            from_x: self.x,
            to_x,
            target_lane: frame.lane_at(to_x),
            progress: 0.0,
        });
        true
    }

    /// Start a lane change to the center of `lane`
    pub fn request_lane_change(&mut self, frame: &WorldFrame, lane: usize) -> bool {
        let lane = frame.clamp_lane(lane as i64);
        self.request_lateral_move(frame, frame.lane_center(lane))
    }

    /// Advance speed, lateral position and world-Y by one tick
    ///
    /// Speed moves toward the target by the smoothing factor and is then
    /// clamped. World-Y moves by the player-frame shift minus the relative
    /// velocity, so the gap to the player changes by
    /// `-(player_speed - speed) * dt` whether or not the caller advances
    /// the player's world-Y.
    pub fn advance(&mut self, player: &PlayerState, step: &MotionStep) {
        self.lifecycle = Lifecycle::Active;

        let speed = self.speed + (self.target_speed - self.speed) * step.smoothing_factor;
        self.speed = speed.clamp(step.min_speed, step.max_speed);

        if let Some(mut transition) = self.lateral.take() {
            transition.progress += step.lane_change_step;
            if transition.progress >= 1.0 {
                self.x = transition.to_x;
                self.lane = transition.target_lane;
            } else {
                self.x = transition.from_x
                    + (transition.to_x - transition.from_x) * transition.progress;
                self.lateral = Some(transition);
            }
        }

        let relative_velocity = (player.speed - self.speed) as f64;
        self.world_y += step.frame_shift - relative_velocity * step.delta_secs as f64;
    }

    /// Overwrite position and speed in place
    pub fn recycle(&mut self, world_y: f64, speed: f32) {
        self.world_y = world_y;
        self.speed = speed;
        self.target_speed = speed;
        self.lifecycle = Lifecycle::Recycled;
        self.recycle_count += 1;
    }

    pub fn snapshot(&self, player_world_y: f64) -> VehicleSnapshot {
        VehicleSnapshot {
            id: self.id,
            recorded_id: self.recorded_id,
            lane: self.lane,
            x: self.x,
            world_y: self.world_y,
            relative_y: relative_y(self.world_y, player_world_y),
            speed: self.speed,
            action: self.action,
        }
    }
}

/// Read-only view of a vehicle for rendering and proximity checks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub recorded_id: Option<u32>,
    pub lane: usize,
    pub x: f32,
    pub world_y: f64,
    /// World-Y relative to the player at snapshot time
    pub relative_y: f32,
    pub speed: f32,
    pub action: TrafficAction,
}
