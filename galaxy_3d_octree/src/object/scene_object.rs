/// Scene object capability surface.
///
/// Objects are owned by game or asset systems. The tree keeps an
/// `Arc<dyn SceneObject>` per registered object and only calls the
/// capabilities below; it never interprets shading.

use bitflags::bitflags;
use glam::Mat4;
use crate::dispatch::RenderItem;
use crate::math::AABB;
use super::object_record::ObjectRecord;

/// Mesh identity used for instancing groups
pub type MeshId = u32;
/// Material identity used for instancing groups
pub type MaterialId = u32;

/// Number of per-node object lists
pub const CATEGORY_COUNT: usize = 5;

/// Concrete object kinds known to the tree.
///
/// The discriminant is the persisted type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ObjectType {
    Unknown = 0,
    Brush = 1,
    Vegetation = 2,
    Decal = 3,
    Road = 4,
    Light = 5,
    WaterVolume = 6,
    Cloud = 7,
    FogVolume = 8,
    ParticleEmitter = 9,
}

impl ObjectType {
    pub const ALL: [ObjectType; 10] = [
        ObjectType::Unknown,
        ObjectType::Brush,
        ObjectType::Vegetation,
        ObjectType::Decal,
        ObjectType::Road,
        ObjectType::Light,
        ObjectType::WaterVolume,
        ObjectType::Cloud,
        ObjectType::FogVolume,
        ObjectType::ParticleEmitter,
    ];

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }

    /// Bit of this type in a node's linked type mask.
    pub fn type_bit(self) -> u32 {
        1 << self.tag()
    }

    /// Per-node list this type is stored in.
    pub fn category(self) -> ObjectCategory {
        match self {
            ObjectType::Vegetation => ObjectCategory::Vegetation,
            ObjectType::Brush | ObjectType::WaterVolume => ObjectCategory::Brush,
            ObjectType::Decal | ObjectType::Road => ObjectCategory::DecalsAndRoads,
            ObjectType::Light => ObjectCategory::Light,
            ObjectType::Unknown
            | ObjectType::Cloud
            | ObjectType::FogVolume
            | ObjectType::ParticleEmitter => ObjectCategory::Unknown,
        }
    }
}

/// Per-node object list index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectCategory {
    Vegetation = 0,
    Brush = 1,
    DecalsAndRoads = 2,
    Light = 3,
    Unknown = 4,
}

impl ObjectCategory {
    pub const ALL: [ObjectCategory; CATEGORY_COUNT] = [
        ObjectCategory::Vegetation,
        ObjectCategory::Brush,
        ObjectCategory::DecalsAndRoads,
        ObjectCategory::Light,
        ObjectCategory::Unknown,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

bitflags! {
    /// Render flags published by an object
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderFlags: u64 {
        const HIDDEN = 1 << 0;
        const SELECTED = 1 << 1;
        const CAST_SHADOW_MAPS = 1 << 2;
        /// Set on nodes whose subtree holds at least one caster
        const HAS_CAST_SHADOW_MAPS = 1 << 3;
        const GOOD_OCCLUDER = 1 << 4;
        const ALPHA_BLENDED = 1 << 5;
        /// Generated at runtime, never streamed
        const PROCEDURAL = 1 << 6;
        const OUTDOOR_ONLY = 1 << 7;

        /// Flags folded into node aggregates
        const AGGREGATED = Self::CAST_SHADOW_MAPS.bits()
            | Self::HAS_CAST_SHADOW_MAPS.bits()
            | Self::GOOD_OCCLUDER.bits();
    }
}

bitflags! {
    /// Flags the tree derives and stores per registered object
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InternalFlags: u32 {
        const REQUIRES_FORWARD_RENDERING = 1 << 0;
        const REQUIRES_NEAREST_CUBEMAP = 1 << 1;
        /// Member of an instancing group, drawn by the group owner
        const STATIC_INSTANCING = 1 << 2;
        /// First member of an instancing group, owns the instance buffer
        const INSTANCING_OWNER = 1 << 3;
        /// Loaded by the streaming controller, dropped on eviction
        const STREAMED = 1 << 4;
    }
}

pub trait SceneObject: Send + Sync {
    /// World-space bounds
    fn bbox(&self) -> AABB;

    fn object_type(&self) -> ObjectType;

    fn render_flags(&self) -> RenderFlags;

    /// Distance beyond which the object is never drawn
    fn max_view_distance(&self) -> f32;

    fn layer_id(&self) -> u16 {
        0
    }

    fn mesh_id(&self) -> Option<MeshId> {
        None
    }

    fn material_id(&self) -> Option<MaterialId> {
        None
    }

    fn world_transform(&self) -> Mat4 {
        Mat4::from_translation(self.bbox().center())
    }

    /// `true` if `prepare_render` may run on a worker thread
    fn can_render_as_job(&self) -> bool {
        false
    }

    fn material_requires_forward(&self) -> bool {
        false
    }

    fn material_requires_nearest_cubemap(&self) -> bool {
        false
    }

    /// Distance at which vegetation swaps its model for a sprite
    fn sprite_switch_distance(&self) -> Option<f32> {
        None
    }

    /// Per-type render work for one emitted item.
    ///
    /// Called on a worker when `can_render_as_job` holds during a job
    /// dispatch, on the main thread otherwise.
    fn prepare_render(&self, _item: &RenderItem) {}

    /// Persistable state, `None` for runtime-only objects
    fn to_record(&self) -> Option<ObjectRecord> {
        None
    }
}
