/// Camera: a passive snapshot of the viewpoint a traversal culls against.
///
/// The caller owns cameras and computes their matrices. The tree only reads
/// the world position (distance tests, nearest-octant ordering) and the
/// frustum.

use glam::{Mat4, Vec3};
use super::frustum::Frustum;

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    frustum: Frustum,
}

impl Camera {
    /// Build a camera from its matrices; position and frustum are derived.
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        let position = view.inverse().col(3).truncate();
        let frustum = Frustum::from_view_projection(&(projection * view));
        Self {
            position,
            view_matrix: view,
            projection_matrix: projection,
            frustum,
        }
    }

    /// Right-handed perspective camera looking from `eye` at `target`.
    pub fn look_at(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let up = if (target - eye).normalize_or_zero().abs_diff_eq(Vec3::Y, 1e-4)
            || (target - eye).normalize_or_zero().abs_diff_eq(Vec3::NEG_Y, 1e-4)
        {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Self::new(
            Mat4::look_at_rh(eye, target, up),
            Mat4::perspective_rh(fov_y, aspect, near, far),
        )
    }

    // ===== GETTERS =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}
