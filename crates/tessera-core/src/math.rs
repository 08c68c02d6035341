//! Math utilities
//!
//! Re-exports from glam and the bounding volume used for mesh summaries.

pub use glam::{Mat4, Quat, Vec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create an empty AABB
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create an AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Build the tightest AABB around a flat `[x, y, z, x, y, z, ...]` buffer.
    ///
    /// Trailing values that do not form a full triple are ignored.
    pub fn from_flat_positions(positions: &[f32]) -> Self {
        let mut aabb = Self::EMPTY;
        for chunk in positions.chunks_exact(3) {
            aabb.expand_to_include(Vec3::new(chunk[0], chunk[1], chunk[2]));
        }
        aabb
    }

    /// Check if the AABB is empty
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand the AABB to include a point
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Merge with another AABB
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Euclidean distance between the camera and an object position
#[inline]
pub fn camera_distance(camera: Vec3, object: Vec3) -> f32 {
    camera.distance(object)
}
