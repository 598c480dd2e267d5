/// VisibilityCuller: one-pass multi-frustum culling.
///
/// For each node it narrows the pass mask inherited from the parent. The
/// main view goes through distance, frustum, occlusion volume and coverage
/// tests; shadow cascades through a distance cutoff and per-cascade frustum
/// or cache-slice tests. Bits are only ever cleared.

use glam::Vec3;
use crate::camera::FrustumTest;
use crate::config::TreeConfig;
use crate::math::AABB;
use crate::object::RenderFlags;
use crate::tree::SpatialNode;
use super::cull_mask::CullMask;
use super::occlusion::OcclusionCuller;
use super::render_pass::{CascadeKind, RenderPassInfo};

/// Mask plus the containment facts descendants inherit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CullState {
    pub mask: CullMask,
    /// An ancestor lies fully inside the main frustum
    pub main_inside: bool,
    /// Cascades whose frustum fully contains an ancestor
    pub cascades_inside: CullMask,
}

impl CullState {
    pub fn new(mask: CullMask) -> Self {
        Self { mask, main_inside: false, cascades_inside: CullMask::EMPTY }
    }

    pub fn is_visible(&self) -> bool {
        !self.mask.is_empty()
    }
}

pub struct VisibilityCuller<'a> {
    pass: &'a RenderPassInfo,
    occlusion: &'a dyn OcclusionCuller,
    config: &'a TreeConfig,
    eye: Vec3,
}

impl<'a> VisibilityCuller<'a> {
    pub fn new(pass: &'a RenderPassInfo, occlusion: &'a dyn OcclusionCuller, config: &'a TreeConfig) -> Self {
        Self {
            pass,
            occlusion,
            config,
            eye: pass.camera().position(),
        }
    }

    pub fn pass(&self) -> &RenderPassInfo {
        self.pass
    }

    /// Zoom-scaled distance from the camera to a box.
    pub fn distance_to(&self, bbox: &AABB) -> f32 {
        bbox.distance_to_point(self.eye) * self.pass.zoom()
    }

    /// Narrow `input` for `node`. The result never holds a bit `input` lacks.
    pub fn update_cull_mask(&self, node: &SpatialNode, input: CullState) -> CullState {
        if input.mask.is_empty() {
            return CullState::default();
        }

        let bbox = node.objects_box();
        if !bbox.is_valid() {
            return CullState::default();
        }

        // Cheapest test first: too far for anything in the subtree
        let distance = self.distance_to(bbox);
        if distance > node.max_view_distance() {
            return CullState::default();
        }

        let mut out = input;
        if out.mask.has_main() && !self.main_view_visible(node, bbox, &mut out) {
            out.mask.remove(CullMask::MAIN);
            out.main_inside = false;
        }
        if out.mask.has_shadows() {
            self.cull_shadow_cascades(node, bbox, distance, &mut out);
        }

        out.cascades_inside = out.cascades_inside.intersection(out.mask);
        debug_assert!(out.mask.is_subset_of(input.mask));
        out
    }

    fn main_view_visible(&self, node: &SpatialNode, bbox: &AABB, out: &mut CullState) -> bool {
        if !out.main_inside {
            match self.pass.camera().frustum().classify_aabb(bbox) {
                FrustumTest::Outside => return false,
                FrustumTest::Inside => out.main_inside = true,
                FrustumTest::Partial => {}
            }
        }

        if node.is_root() {
            return true;
        }
        if self.occlusion.is_occluded_by_volume(bbox) {
            return false;
        }
        // Small nodes leave occlusion to the per-object test
        if node.radius() > self.config.coverage_node_min_radius
            && !bbox.contains_point(self.eye)
            && self.occlusion.is_box_occluded(bbox)
        {
            return false;
        }
        true
    }

    fn cull_shadow_cascades(&self, node: &SpatialNode, bbox: &AABB, distance: f32, out: &mut CullState) {
        let cutoff = node.max_view_distance() * self.config.shadow_cast_view_dist_ratio;
        if distance > cutoff || !node.render_flags().contains(RenderFlags::HAS_CAST_SHADOW_MAPS) {
            out.mask = out.mask.intersection(CullMask::MAIN);
            return;
        }

        let mut skip_coarser = false;
        for cascade in self.pass.cascades() {
            let bit = cascade.bit();
            if !out.mask.contains(bit) {
                continue;
            }

            match cascade.kind() {
                CascadeKind::Dynamic => {
                    if skip_coarser {
                        out.mask.remove(bit);
                        continue;
                    }
                    let inside = if out.cascades_inside.contains(bit) {
                        true
                    } else {
                        match cascade.frustum().classify_aabb(bbox) {
                            FrustumTest::Outside => {
                                out.mask.remove(bit);
                                continue;
                            }
                            FrustumTest::Inside => {
                                out.cascades_inside.insert(bit);
                                true
                            }
                            FrustumTest::Partial => false,
                        }
                    };
                    // Fully inside a finer cascade: coarser dynamic ones are skipped
                    if inside && self.config.skip_coarser_cascades {
                        skip_coarser = true;
                    }
                }
                CascadeKind::Cached | CascadeKind::PerObject => {
                    if node.shadow_slice_frame() != Some(self.pass.frame_id())
                        || !cascade.frustum().intersects_aabb(bbox)
                    {
                        out.mask.remove(bit);
                    }
                }
            }
        }
    }

    /// Object-granularity version of `update_cull_mask`.
    ///
    /// Returns the object's mask and its zoom-scaled distance. The
    /// per-object occlusion test only runs inside nodes larger than the
    /// configured size.
    pub fn object_cull_mask(
        &self,
        bbox: &AABB,
        max_view: f32,
        flags: RenderFlags,
        node_radius: f32,
        node_state: &CullState,
    ) -> (CullMask, f32) {
        let distance = self.distance_to(bbox);
        if distance > max_view || flags.contains(RenderFlags::HIDDEN) {
            return (CullMask::EMPTY, distance);
        }

        let mut mask = node_state.mask;
        if mask.has_main() {
            let visible = node_state.main_inside || self.pass.camera().frustum().intersects_aabb(bbox);
            let occluded = visible
                && node_radius > self.config.per_object_occlusion_min_node_size
                && !bbox.contains_point(self.eye)
                && self.occlusion.is_box_occluded(bbox);
            if !visible || occluded {
                mask.remove(CullMask::MAIN);
            }
        }

        if mask.has_shadows() {
            if !flags.contains(RenderFlags::CAST_SHADOW_MAPS)
                || distance > max_view * self.config.shadow_cast_view_dist_ratio
            {
                mask = mask.intersection(CullMask::MAIN);
            } else {
                for cascade in self.pass.cascades() {
                    let bit = cascade.bit();
                    if mask.contains(bit)
                        && !node_state.cascades_inside.contains(bit)
                        && !cascade.frustum().intersects_aabb(bbox)
                    {
                        mask.remove(bit);
                    }
                }
            }
        }

        (mask, distance)
    }
}

#[cfg(test)]
#[path = "visibility_culler_tests.rs"]
mod tests;
