//! Core types for the driving simulation
//!
//! The world frame is a scrolling road: world-Y is cumulative forward
//! distance, world-X is the lateral position across the lanes. Only
//! differences between a vehicle's world-Y and the player's world-Y carry
//! meaning, so world-Y is kept in `f64` and every relative value handed to
//! rendering or distance checks is narrowed to `f32`.

/// A unique identifier for a vehicle slot in the traffic pool
/// This is the slot index, stable for the lifetime of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

/// Snapshot of the player handed to the traffic engine and monitor each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    /// Lateral world-X position
    pub x: f32,
    /// Lane derived from `x`
    pub lane: usize,
    /// Cumulative forward distance
    pub world_y: f64,
    /// Forward speed in units per second
    pub speed: f32,
}

impl PlayerState {
    pub fn new(x: f32, lane: usize, world_y: f64, speed: f32) -> Self {
        Self {
            x,
            lane,
            world_y,
            speed,
        }
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            x: 0.0,
            lane: 0,
            world_y: 0.0,
            speed: 0.0,
        }
    }
}

/// Lane geometry of the road
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldFrame {
    pub lane_count: usize,
    pub lane_width: f32,
}

impl WorldFrame {
    pub fn new(lane_count: usize, lane_width: f32) -> Self {
        Self {
            lane_count,
            lane_width,
        }
    }

    /// Total road width in world-X units
    pub fn road_width(&self) -> f32 {
        self.lane_count as f32 * self.lane_width
    }

    /// World-X of the center line of a lane
    pub fn lane_center(&self, lane: usize) -> f32 {
        (self.clamp_lane(lane as i64) as f32 + 0.5) * self.lane_width
    }

    /// Lane containing the given world-X, clamped to the road
    pub fn lane_at(&self, x: f32) -> usize {
        if !x.is_finite() || self.lane_width <= 0.0 {
            return 0;
        }
        self.clamp_lane((x / self.lane_width).floor() as i64)
    }

    pub fn clamp_lane(&self, lane: i64) -> usize {
        let last = self.lane_count.saturating_sub(1) as i64;
        lane.clamp(0, last) as usize
    }

    /// Clamp a world-X value onto the road surface
    pub fn clamp_x(&self, x: f32) -> f32 {
        x.clamp(0.0, self.road_width())
    }
}

/// Forward offset of `world_y` relative to the reference `origin_y`
///
/// Positive means ahead of the reference.
pub fn relative_y(world_y: f64, origin_y: f64) -> f32 {
    (world_y - origin_y) as f32
}

/// Euclidean distance between two points in the player's frame
pub fn planar_distance(x_a: f32, y_a: f64, x_b: f32, y_b: f64) -> f32 {
    let dx = x_a - x_b;
    let dy = relative_y(y_a, y_b);
    (dx * dx + dy * dy).sqrt()
}
