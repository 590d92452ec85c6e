//! Standalone driving simulation module
//!
//! This module contains the traffic engine, player kinematics and risk
//! monitoring. It runs headless; rendering, audio and input devices are
//! left to the caller.

mod config;
mod coordinates;
mod engine;
mod generator;
mod player;
mod proximity;
mod replay;
mod traffic_manager;
mod traffic_source;
mod types;
mod vehicle;
mod warnings;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use config::{SimulationConfig, SpeedSmoothing};
#[allow(unused_imports)]
pub use coordinates::CoordinateMapping;
#[allow(unused_imports)]
pub use engine::{EngineStats, EngineTick, TrafficEngine};
#[allow(unused_imports)]
pub use generator::{
    generate_trajectories, generate_trajectory_file, write_trajectories, GeneratorOptions,
};
#[allow(unused_imports)]
pub use player::{PlayerControls, PlayerKinematics, MAX_SPEED_LEVEL};
#[allow(unused_imports)]
pub use proximity::{Assessment, ProximityMonitor, RiskLevel, SwerveDetector, SwerveState};
#[allow(unused_imports)]
pub use replay::{PlaybackClock, ReplaySource, TrajectoryRecord, TrajectoryTable};
#[allow(unused_imports)]
pub use traffic_manager::{
    find_clear_slot, recycle_vehicles, resolve_lane_overlaps, sample_speed, spawn_procedural_pool,
    spawn_replay_pool,
};
#[allow(unused_imports)]
pub use traffic_source::{ProceduralSource, SourceUpdate, TrafficMode, TrafficSource};
#[allow(unused_imports)]
pub use types::{planar_distance, relative_y, PlayerState, VehicleId, WorldFrame};
#[allow(unused_imports)]
pub use vehicle::{
    LateralTransition, Lifecycle, MotionStep, TrafficAction, Vehicle, VehicleSnapshot,
};
#[allow(unused_imports)]
pub use warnings::{WarningEvent, WarningLog, WarningType};
pub use world::{SimWorld, TickReport};
