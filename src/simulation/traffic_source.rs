//! Providers of per-tick vehicle targets
//!
//! A source is chosen when the engine is built and never switches: either
//! procedural generation or recorded replay.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::Rng;

use super::config::SimulationConfig;
use super::replay::ReplaySource;
use super::types::{PlayerState, WorldFrame};
use super::vehicle::{TrafficAction, Vehicle};

/// Targets a source produced for one vehicle this tick
///
/// `None` fields leave the vehicle's current target untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceUpdate {
    pub target_speed: Option<f32>,
    /// Lateral world-X target (replay)
    pub target_x: Option<f32>,
    /// Adjacent lane to move into (procedural)
    pub lane_change: Option<usize>,
    pub action: Option<TrafficAction>,
}

/// Which kind of source drives the traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficMode {
    Procedural,
    Replay,
}

impl TrafficMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficMode::Procedural => "procedural",
            TrafficMode::Replay => "replay",
        }
    }
}

/// Randomised traffic with a light car-following blend
#[derive(Debug, Clone)]
pub struct ProceduralSource {
    frame: WorldFrame,
    min_speed: f32,
    max_speed: f32,
    speed_change_probability: f64,
    speed_jitter: f32,
    lane_change_probability: f64,
    follow_blend: f32,
}

impl ProceduralSource {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            frame: config.world_frame(),
            min_speed: config.min_speed,
            max_speed: config.max_speed,
            speed_change_probability: config.speed_change_probability,
            speed_jitter: config.speed_jitter,
            lane_change_probability: config.lane_change_probability,
            follow_blend: config.follow_blend,
        }
    }

    /// Perturb the target speed, blend toward the player in a shared lane,
    /// and occasionally propose a move to an adjacent lane
    ///
    /// The blend only pulls speeds together; it does not keep a safe
    /// following distance.
    pub fn step(&self, vehicle: &Vehicle, player: &PlayerState, rng: &mut StdRng) -> SourceUpdate {
        let mut target = vehicle.target_speed;

        if rng.random_bool(self.speed_change_probability) {
            target += rng.random_range(-self.speed_jitter..=self.speed_jitter);
        }

        if vehicle.lane == player.lane {
            target += (player.speed - target) * self.follow_blend;
        }
        let target = target.clamp(self.min_speed, self.max_speed);

        let mut lane_change = None;
        if !vehicle.is_changing_lane() && rng.random_bool(self.lane_change_probability) {
            let direction = if rng.random_bool(0.5) { 1 } else { -1 };
            let lane = self.frame.clamp_lane(vehicle.lane as i64 + direction);
            if lane != vehicle.lane {
                lane_change = Some(lane);
            }
        }

        SourceUpdate {
            target_speed: Some(target),
            target_x: None,
            lane_change,
            action: Some(if lane_change.is_some() {
                TrafficAction::ChangeLane
            } else {
                TrafficAction::Maintain
            }),
        }
    }
}

/// The active traffic source
#[derive(Debug, Clone)]
pub enum TrafficSource {
    Procedural(ProceduralSource),
    Replay(ReplaySource),
}

impl TrafficSource {
    pub fn mode(&self) -> TrafficMode {
        match self {
            TrafficSource::Procedural(_) => TrafficMode::Procedural,
            TrafficSource::Replay(_) => TrafficMode::Replay,
        }
    }

    /// Called once per tick before any vehicle is stepped
    pub fn begin_tick(&mut self) {
        if let TrafficSource::Replay(replay) = self {
            replay.begin_tick();
        }
    }

    /// Produce this tick's targets for one vehicle
    pub fn step(
        &self,
        vehicle: &Vehicle,
        player: &PlayerState,
        rng: &mut StdRng,
    ) -> Result<SourceUpdate> {
        match self {
            TrafficSource::Procedural(procedural) => Ok(procedural.step(vehicle, player, rng)),
            TrafficSource::Replay(replay) => replay.step(vehicle),
        }
    }

    pub fn as_replay(&self) -> Option<&ReplaySource> {
        match self {
            TrafficSource::Replay(replay) => Some(replay),
            TrafficSource::Procedural(_) => None,
        }
    }
}
