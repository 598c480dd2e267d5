/// Occlusion seam: the occlusion-volume and coverage-buffer systems live
/// outside the tree and answer box queries through this trait.

use crate::math::AABB;

pub trait OcclusionCuller: Send + Sync {
    /// Hidden behind an occlusion volume (portal, antiportal)
    fn is_occluded_by_volume(&self, _bbox: &AABB) -> bool {
        false
    }

    /// Hidden according to the coverage buffer
    fn is_box_occluded(&self, bbox: &AABB) -> bool;
}

/// Occlusion system that never hides anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOcclusion;

impl OcclusionCuller for NoOcclusion {
    fn is_box_occluded(&self, _bbox: &AABB) -> bool {
        false
    }
}
