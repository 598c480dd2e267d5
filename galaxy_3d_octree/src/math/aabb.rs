/// Axis-aligned bounding box.
///
/// Node boxes, aggregated objects boxes and object bounds all use this type.
/// `AABB::RESET` is the empty box: adding any box to it yields that box.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl AABB {
    /// Inverted box used as the start of a union.
    pub const RESET: AABB = AABB {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// `false` for `RESET` and any other inverted box.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Grow this box to enclose `other`.
    pub fn add_box(&mut self, other: &AABB) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Squared radius of the bounding sphere around the box.
    pub fn radius_sq(&self) -> f32 {
        self.size().length_squared() * 0.25
    }

    pub fn radius(&self) -> f32 {
        self.radius_sq().sqrt()
    }

    /// Test if this AABB fully contains another AABB.
    pub fn contains(&self, other: &AABB) -> bool {
        self.min.x <= other.min.x && self.max.x >= other.max.x
        && self.min.y <= other.min.y && self.max.y >= other.max.y
        && self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.min.x <= point.x && self.max.x >= point.x
        && self.min.y <= point.y && self.max.y >= point.y
        && self.min.z <= point.z && self.max.z >= point.z
    }

    /// Test if this AABB intersects (overlaps or touches) another AABB.
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
        && self.min.y <= other.max.y && self.max.y >= other.min.y
        && self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Squared distance from a point to the closest point of the box (0 inside).
    pub fn distance_sq_to_point(&self, point: Vec3) -> f32 {
        let d = (self.min - point).max(Vec3::ZERO).max(point - self.max);
        d.length_squared()
    }

    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.distance_sq_to_point(point).sqrt()
    }

    /// Box of one octant (0-7) of this box split at `center`.
    ///
    /// Octant bit layout: bit0 = X, bit1 = Y, bit2 = Z (0 = low, 1 = high).
    pub fn octant(&self, center: Vec3, octant: usize) -> AABB {
        AABB {
            min: Vec3::new(
                if octant & 1 == 0 { self.min.x } else { center.x },
                if octant & 2 == 0 { self.min.y } else { center.y },
                if octant & 4 == 0 { self.min.z } else { center.z },
            ),
            max: Vec3::new(
                if octant & 1 == 0 { center.x } else { self.max.x },
                if octant & 2 == 0 { center.y } else { self.max.y },
                if octant & 4 == 0 { center.z } else { self.max.z },
            ),
        }
    }
}

/// Octant of `point` relative to `center`, same bit layout as [`AABB::octant`].
pub fn point_octant(center: Vec3, point: Vec3) -> usize {
    ((point.x >= center.x) as usize)
        | (((point.y >= center.y) as usize) << 1)
        | (((point.z >= center.z) as usize) << 2)
}

#[cfg(test)]
#[path = "aabb_tests.rs"]
mod tests;
