/// Scene object rebuilt from a persisted record.
///
/// This is what the loader and the streaming controller register in the
/// tree. It answers every capability from the record it was built from.

use glam::{EulerRot, Mat4, Quat, Vec3, Vec4};
use crate::math::AABB;
use super::object_record::{ObjectRecord, RecordPayload};
use super::scene_object::{MaterialId, MeshId, ObjectType, RenderFlags, SceneObject};

#[derive(Debug, Clone)]
pub struct PersistedObject {
    record: ObjectRecord,
}

impl PersistedObject {
    pub fn new(record: ObjectRecord) -> Self {
        Self { record }
    }

    pub fn record(&self) -> &ObjectRecord {
        &self.record
    }
}

fn angle_from_byte(value: u8) -> f32 {
    value as f32 * std::f32::consts::TAU / 256.0
}

impl SceneObject for PersistedObject {
    fn bbox(&self) -> AABB {
        self.record.bbox
    }

    fn object_type(&self) -> ObjectType {
        self.record.object_type
    }

    fn render_flags(&self) -> RenderFlags {
        self.record.render_flags
    }

    fn max_view_distance(&self) -> f32 {
        self.record.max_view_distance()
    }

    fn layer_id(&self) -> u16 {
        self.record.layer_id
    }

    fn mesh_id(&self) -> Option<MeshId> {
        match self.record.object_type {
            ObjectType::Vegetation | ObjectType::Brush => Some(self.record.mesh_index as MeshId),
            _ => None,
        }
    }

    fn material_id(&self) -> Option<MaterialId> {
        self.record.payload.material()
    }

    fn world_transform(&self) -> Mat4 {
        match &self.record.payload {
            RecordPayload::Vegetation { position, scale, angles, .. } => {
                let rotation = Quat::from_euler(
                    EulerRot::XYZ,
                    angle_from_byte(angles[0]),
                    angle_from_byte(angles[1]),
                    angle_from_byte(angles[2]),
                );
                Mat4::from_scale_rotation_translation(Vec3::splat(*scale), rotation, *position)
            }
            RecordPayload::Brush { transform: t, .. } => Mat4::from_cols(
                Vec4::new(t[0], t[4], t[8], 0.0),
                Vec4::new(t[1], t[5], t[9], 0.0),
                Vec4::new(t[2], t[6], t[10], 0.0),
                Vec4::new(t[3], t[7], t[11], 1.0),
            ),
            RecordPayload::Decal { position, .. } => Mat4::from_translation(*position),
            _ => Mat4::from_translation(self.record.bbox.center()),
        }
    }

    fn can_render_as_job(&self) -> bool {
        !matches!(self.record.object_type, ObjectType::Light | ObjectType::ParticleEmitter)
    }

    fn sprite_switch_distance(&self) -> Option<f32> {
        if self.record.object_type == ObjectType::Vegetation && self.record.lod_ratio > 0 {
            Some(self.record.bbox.radius() * self.record.lod_ratio as f32)
        } else {
            None
        }
    }

    fn to_record(&self) -> Option<ObjectRecord> {
        Some(self.record.clone())
    }
}
