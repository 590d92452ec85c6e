//! Mapping from detector output into simulation world coordinates

/// Linear scale from bird's-eye coordinates into world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapping {
    pub x_scale: f32,
    pub y_scale: f32,
}

impl CoordinateMapping {
    /// Leaves coordinates untouched
    pub const IDENTITY: CoordinateMapping = CoordinateMapping {
        x_scale: 1.0,
        y_scale: 1.0,
    };

    /// Scale used by the video detection pipeline's exporter
    pub const DETECTOR: CoordinateMapping = CoordinateMapping {
        x_scale: 2.0,
        y_scale: 5.0,
    };

    pub fn new(x_scale: f32, y_scale: f32) -> Self {
        Self { x_scale, y_scale }
    }

    pub fn map_x(&self, x: f32) -> f32 {
        x * self.x_scale
    }

    pub fn map_y(&self, y: f64) -> f64 {
        y * self.y_scale as f64
    }

    /// Map a transformed (x, y) point to (world_x, world_y)
    pub fn to_simulation(&self, x: f32, y: f32) -> (f32, f64) {
        (self.map_x(x), self.map_y(y as f64))
    }
}

impl Default for CoordinateMapping {
    fn default() -> Self {
        Self::IDENTITY
    }
}
