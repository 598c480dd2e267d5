/// Frustum: six clipping planes used by every visibility test of the tree.
///
/// Each plane is a Vec4 (A, B, C, D) with an inward-pointing unit normal.
/// A point P is inside when dot(plane, P_homogeneous) >= 0 for all planes.
/// Main views and shadow cascades share this type.

use glam::{Mat4, Vec3, Vec4};
use crate::math::AABB;

/// Result of a 3-way frustum/AABB classification.
///
/// - `Outside` → the pass bit is cleared for the whole subtree
/// - `Inside` → descendants skip the test for this pass
/// - `Partial` → descendants test again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumTest {
    Outside,
    Inside,
    Partial,
}

pub const PLANE_LEFT: usize = 0;
pub const PLANE_RIGHT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_NEAR: usize = 4;
pub const PLANE_FAR: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// Frustum planes: left, right, bottom, top, near, far
    pub planes: [Vec4; 6],
}

/// Box corner furthest along `normal`.
#[inline]
fn positive_vertex(aabb: &AABB, normal: Vec3) -> Vec3 {
    Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min)
}

/// Box corner furthest against `normal`.
#[inline]
fn negative_vertex(aabb: &AABB, normal: Vec3) -> Vec3 {
    Vec3::select(normal.cmpge(Vec3::ZERO), aabb.min, aabb.max)
}

impl Frustum {
    /// Extract planes from a view-projection matrix with a [0, 1] depth range
    /// (glam `*_rh` / `*_lh` projections).
    ///
    /// Gribb & Hartmann: each plane is a sum or difference of matrix rows.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let r0 = vp.row(0);
        let r1 = vp.row(1);
        let r2 = vp.row(2);
        let r3 = vp.row(3);

        let mut planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2];
        for plane in &mut planes {
            let normal_len = plane.truncate().length();
            if normal_len > 0.0 {
                *plane /= normal_len;
            }
        }

        Self { planes }
    }

    /// Signed distance of a point to one plane (positive inside).
    #[inline]
    pub fn plane_distance(&self, plane: usize, point: Vec3) -> f32 {
        let p = self.planes[plane];
        p.truncate().dot(point) + p.w
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        (0..6).all(|i| self.plane_distance(i, point) >= 0.0)
    }

    /// Conservative overlap test (p-vertex): may report false positives,
    /// never false negatives.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            normal.dot(positive_vertex(aabb, normal)) + plane.w >= 0.0
        })
    }

    /// Classify an AABB against the frustum (3-way test).
    pub fn classify_aabb(&self, aabb: &AABB) -> FrustumTest {
        let mut all_inside = true;

        for plane in &self.planes {
            let normal = plane.truncate();

            if normal.dot(positive_vertex(aabb, normal)) + plane.w < 0.0 {
                return FrustumTest::Outside;
            }
            if normal.dot(negative_vertex(aabb, normal)) + plane.w < 0.0 {
                all_inside = false;
            }
        }

        if all_inside { FrustumTest::Inside } else { FrustumTest::Partial }
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
