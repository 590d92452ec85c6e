//! Player vehicle kinematics
//!
//! Discrete speed targets with constant-rate acceleration, a hard brake,
//! and heading-based steering. Produces the reference frame traffic is
//! measured against.

use anyhow::{Context, Result};

use super::config::SimulationConfig;
use super::types::{PlayerState, WorldFrame};

/// Speed below which steering input does not turn the car
const MIN_TURNING_SPEED: f32 = 5.0;

/// Highest discrete speed level
pub const MAX_SPEED_LEVEL: u8 = 9;

/// Driver input for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerControls {
    /// Select target speed `level / 9 * player_max_speed`
    pub speed_level: Option<u8>,
    /// Hard brake while held
    pub brake: bool,
    /// -1 left, 0 straight, 1 right
    pub steer: i8,
}

pub struct PlayerKinematics {
    frame: WorldFrame,
    max_speed: f32,
    acceleration_rate: f32,
    brake_multiplier: f32,
    turning_speed: f32,
    max_heading: f32,
    half_width: f32,

    pub x: f32,
    pub world_y: f64,
    /// Direction of travel in degrees, 0 is straight ahead
    pub heading: f32,
    pub speed: f32,
    pub target_speed: f32,
    pub acceleration: f32,
    steer: f32,
    braking: bool,
    /// Target to restore when the brake is released
    resume_speed: f32,
}

impl PlayerKinematics {
    /// Start stationary in the middle of the road
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        config.validate().context("Invalid player configuration")?;
        let frame = config.world_frame();
        Ok(Self {
            frame,
            max_speed: config.player_max_speed,
            acceleration_rate: config.acceleration_rate,
            brake_multiplier: config.brake_multiplier,
            turning_speed: config.turning_speed,
            max_heading: config.max_heading,
            half_width: config.player_half_width,
            x: (frame.lane_count / 2) as f32 * frame.lane_width + frame.lane_width / 2.0,
            world_y: 0.0,
            heading: 0.0,
            speed: 0.0,
            target_speed: 0.0,
            acceleration: 0.0,
            steer: 0.0,
            braking: false,
            resume_speed: 0.0,
        })
    }

    pub fn lane(&self) -> usize {
        self.frame.lane_at(self.x)
    }

    pub fn state(&self) -> PlayerState {
        PlayerState::new(self.x, self.lane(), self.world_y, self.speed)
    }

    pub fn is_braking(&self) -> bool {
        self.braking
    }

    /// Target speed for a discrete speed level
    pub fn speed_for_level(&self, level: u8) -> f32 {
        level.min(MAX_SPEED_LEVEL) as f32 / MAX_SPEED_LEVEL as f32 * self.max_speed
    }

    /// Apply driver input
    ///
    /// The brake decelerates immediately at `brake_multiplier` times the
    /// normal rate; releasing it restores the target held before braking.
    pub fn apply_controls(&mut self, controls: &PlayerControls, delta_secs: f32) {
        if let Some(level) = controls.speed_level {
            self.target_speed = self.speed_for_level(level);
        }

        if controls.brake {
            if !self.braking {
                self.braking = true;
                self.resume_speed = self.target_speed;
            }
            if self.speed > 0.0 {
                self.acceleration = -self.acceleration_rate * self.brake_multiplier;
                self.speed = (self.speed + self.acceleration * delta_secs).max(0.0);
            }
            self.target_speed = 0.0;
        } else if self.braking {
            self.braking = false;
            self.target_speed = self.resume_speed;
        }

        self.steer = controls.steer.signum() as f32;
    }

    /// Advance speed, heading and position by one tick
    pub fn update(&mut self, delta_secs: f32) {
        let speed_diff = self.target_speed - self.speed;
        if speed_diff != 0.0 {
            self.acceleration = speed_diff.signum() * self.acceleration_rate;
            let change = self.acceleration * delta_secs;
            // Land exactly on the target instead of oscillating around it
            self.speed = if change.abs() >= speed_diff.abs() {
                self.target_speed
            } else {
                self.speed + change
            };
            self.speed = self.speed.clamp(0.0, self.max_speed);
        } else {
            self.acceleration = 0.0;
        }

        if self.speed > MIN_TURNING_SPEED {
            self.heading += self.steer * self.turning_speed * (self.speed / self.max_speed);
        }
        self.heading = self.heading.clamp(-self.max_heading, self.max_heading);

        let radians = self.heading.to_radians();
        self.x += radians.sin() * self.speed * delta_secs;
        self.world_y += (radians.cos() * self.speed * delta_secs) as f64;

        let road_width = self.frame.road_width();
        self.x = self.x.clamp(self.half_width, road_width - self.half_width);
    }

    /// Stop dead, used after a collision
    pub fn stop(&mut self) {
        self.speed = 0.0;
        self.target_speed = 0.0;
        self.acceleration = 0.0;
        self.braking = false;
        self.resume_speed = 0.0;
    }
}
