/// Render-pass descriptor consumed by a traversal.
///
/// Owned by the caller for the duration of one frame; the tree only reads it.

use crate::camera::{Camera, Frustum};
use super::cull_mask::CullMask;

/// How a shadow cascade is maintained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeKind {
    /// Follows the camera, rendered every frame
    Dynamic,
    /// Stabilized across frames, refreshed slice by slice
    Cached,
    /// Dedicated map for a single caster, refreshed with the cache slices
    PerObject,
}

#[derive(Debug, Clone)]
pub struct ShadowCascade {
    frustum: Frustum,
    index: u8,
    kind: CascadeKind,
}

impl ShadowCascade {
    /// `index` selects the mask bit (1..=63); larger indices are coarser.
    pub fn new(frustum: Frustum, index: u8, kind: CascadeKind) -> Self {
        debug_assert!((1..=CullMask::MAX_CASCADE).contains(&index), "cascade index {} out of range", index);
        Self {
            frustum,
            index: index.clamp(1, CullMask::MAX_CASCADE),
            kind,
        }
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn kind(&self) -> CascadeKind {
        self.kind
    }

    pub fn bit(&self) -> CullMask {
        CullMask::cascade(self.index)
    }
}

#[derive(Debug, Clone)]
pub struct RenderPassInfo {
    camera: Camera,
    cascades: Vec<ShadowCascade>,
    zoom: f32,
    general_pass: bool,
    frame_id: u32,
}

impl RenderPassInfo {
    /// General pass with no cascades and zoom 1.
    pub fn new(camera: Camera, frame_id: u32) -> Self {
        Self {
            camera,
            cascades: Vec::new(),
            zoom: 1.0,
            general_pass: true,
            frame_id,
        }
    }

    /// Add a cascade, keeping cascades ordered fine to coarse.
    pub fn with_cascade(mut self, cascade: ShadowCascade) -> Self {
        let position = self.cascades.partition_point(|c| c.index < cascade.index);
        self.cascades.insert(position, cascade);
        self
    }

    /// Distances are scaled by `zoom` (1 = no zoom).
    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom;
        self
    }

    /// Secondary passes (reflections, previews) never use content jobs.
    pub fn with_general_pass(mut self, general_pass: bool) -> Self {
        self.general_pass = general_pass;
        self
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn cascades(&self) -> &[ShadowCascade] {
        &self.cascades
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn is_general_pass(&self) -> bool {
        self.general_pass
    }

    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    /// Mask with the main bit and every cascade bit set.
    pub fn full_mask(&self) -> CullMask {
        self.cascades
            .iter()
            .fold(CullMask::MAIN, |mask, cascade| mask.union(cascade.bit()))
    }
}
