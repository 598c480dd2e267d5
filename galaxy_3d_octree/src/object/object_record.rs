/// Persistable object state: the common header every record carries plus
/// a type-specific payload.

use glam::Vec3;
use crate::math::AABB;
use super::scene_object::{MaterialId, ObjectType, RenderFlags};

/// Lower bound for view distances derived from a record
pub const MIN_RECORD_VIEW_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub object_type: ObjectType,
    pub bbox: AABB,
    pub layer_id: u16,
    pub shadow_lod_bias: i8,
    pub render_flags: RenderFlags,
    /// Index into the level's mesh table
    pub mesh_index: u16,
    /// View distance per unit of bounding radius
    pub view_dist_ratio: u8,
    /// Sprite switch distance per unit of bounding radius (0 = no sprite)
    pub lod_ratio: u8,
    pub payload: RecordPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordPayload {
    None,
    Vegetation {
        position: Vec3,
        scale: f32,
        /// Euler angles quantized to 256 steps per turn
        angles: [u8; 3],
        material: MaterialId,
    },
    Brush {
        /// Row-major 3x4 world transform
        transform: [f32; 12],
        material: MaterialId,
    },
    Decal {
        position: Vec3,
        normal: Vec3,
        radius: f32,
        material: MaterialId,
        sort_priority: u8,
    },
    Road {
        material: MaterialId,
        sort_priority: u8,
        vertex_count: u32,
    },
    WaterVolume {
        material: MaterialId,
        vertex_count: u32,
        index_count: u32,
    },
    Light {
        color: Vec3,
        radius: f32,
    },
}

impl RecordPayload {
    /// Zeroed payload of the shape `object_type` persists.
    pub fn default_for(object_type: ObjectType) -> Self {
        match object_type {
            ObjectType::Vegetation => RecordPayload::Vegetation {
                position: Vec3::ZERO,
                scale: 1.0,
                angles: [0; 3],
                material: 0,
            },
            ObjectType::Brush => RecordPayload::Brush {
                transform: [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                material: 0,
            },
            ObjectType::Decal => RecordPayload::Decal {
                position: Vec3::ZERO,
                normal: Vec3::Y,
                radius: 1.0,
                material: 0,
                sort_priority: 0,
            },
            ObjectType::Road => RecordPayload::Road { material: 0, sort_priority: 0, vertex_count: 0 },
            ObjectType::WaterVolume => RecordPayload::WaterVolume { material: 0, vertex_count: 0, index_count: 0 },
            ObjectType::Light => RecordPayload::Light { color: Vec3::ONE, radius: 1.0 },
            ObjectType::Unknown
            | ObjectType::Cloud
            | ObjectType::FogVolume
            | ObjectType::ParticleEmitter => RecordPayload::None,
        }
    }

    /// `true` if this payload has the shape `object_type` persists.
    pub fn matches(&self, object_type: ObjectType) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(&Self::default_for(object_type))
    }

    pub fn material(&self) -> Option<MaterialId> {
        match self {
            RecordPayload::Vegetation { material, .. }
            | RecordPayload::Brush { material, .. }
            | RecordPayload::Decal { material, .. }
            | RecordPayload::Road { material, .. }
            | RecordPayload::WaterVolume { material, .. } => Some(*material),
            RecordPayload::None | RecordPayload::Light { .. } => None,
        }
    }
}

impl ObjectRecord {
    pub fn new(object_type: ObjectType, bbox: AABB) -> Self {
        Self {
            object_type,
            bbox,
            layer_id: 0,
            shadow_lod_bias: 0,
            render_flags: RenderFlags::empty(),
            mesh_index: 0,
            view_dist_ratio: 100,
            lod_ratio: 0,
            payload: RecordPayload::default_for(object_type),
        }
    }

    /// Types whose records stay on disk until the streaming controller asks
    /// for them: non-procedural vegetation, decals and roads.
    pub fn is_streamable(&self) -> bool {
        match self.object_type {
            ObjectType::Vegetation => !self.render_flags.contains(RenderFlags::PROCEDURAL),
            ObjectType::Decal | ObjectType::Road => true,
            _ => false,
        }
    }

    pub fn max_view_distance(&self) -> f32 {
        (self.bbox.radius() * self.view_dist_ratio as f32).max(MIN_RECORD_VIEW_DISTANCE)
    }
}
