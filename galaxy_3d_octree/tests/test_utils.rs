//! Shared helpers for the integration tests
//!
//! Scene objects owned by the tests and seeded random scene builders.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use galaxy_3d_octree::galaxy3d::math::AABB;
use galaxy_3d_octree::galaxy3d::object::{ObjectRecord, ObjectType, RenderFlags, SceneObject};
use galaxy_3d_octree::glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;

pub const WORLD_HALF: f32 = 512.0;

pub fn world() -> AABB {
    AABB::new(Vec3::splat(-WORLD_HALF), Vec3::splat(WORLD_HALF))
}

// ============================================================================
// TEST OBJECT
// ============================================================================

/// Movable scene object owned by a test
pub struct Prop {
    bbox: Mutex<AABB>,
    object_type: ObjectType,
    flags: RenderFlags,
    max_view: f32,
}

impl Prop {
    pub fn new(bbox: AABB, object_type: ObjectType, flags: RenderFlags, max_view: f32) -> Arc<Self> {
        Arc::new(Self { bbox: Mutex::new(bbox), object_type, flags, max_view })
    }

    pub fn move_to(&self, bbox: AABB) {
        *self.bbox.lock().unwrap() = bbox;
    }
}

impl SceneObject for Prop {
    fn bbox(&self) -> AABB {
        *self.bbox.lock().unwrap()
    }

    fn object_type(&self) -> ObjectType {
        self.object_type
    }

    fn render_flags(&self) -> RenderFlags {
        self.flags
    }

    fn max_view_distance(&self) -> f32 {
        self.max_view
    }
}

// ============================================================================
// RANDOM SCENES
// ============================================================================

const HALF_SIZES: [f32; 7] = [0.1, 0.25, 0.5, 1.0, 3.0, 10.0, 40.0];

const TYPES: [ObjectType; 6] = [
    ObjectType::Brush,
    ObjectType::Vegetation,
    ObjectType::Decal,
    ObjectType::Road,
    ObjectType::Light,
    ObjectType::WaterVolume,
];

pub fn random_box(rng: &mut StdRng) -> AABB {
    let center = Vec3::new(
        rng.random_range(-480.0..480.0),
        rng.random_range(-60.0..60.0),
        rng.random_range(-480.0..480.0),
    );
    let half = HALF_SIZES[rng.random_range(0..HALF_SIZES.len())];
    AABB::from_center_half_extent(center, Vec3::splat(half))
}

pub fn random_prop(rng: &mut StdRng) -> Arc<Prop> {
    let bbox = random_box(rng);
    let object_type = TYPES[rng.random_range(0..TYPES.len())];
    let flags = if rng.random_bool(0.4) { RenderFlags::CAST_SHADOW_MAPS } else { RenderFlags::empty() };
    let max_view = bbox.radius() * rng.random_range(20.0..150.0);
    Prop::new(bbox, object_type, flags, max_view.max(1.0))
}

/// Persistable record with randomized common fields.
pub fn random_record(rng: &mut StdRng) -> ObjectRecord {
    let object_type = TYPES[rng.random_range(0..TYPES.len())];
    let mut record = ObjectRecord::new(object_type, random_box(rng));
    record.layer_id = rng.random_range(0..4);
    record.shadow_lod_bias = rng.random_range(-3..4);
    record.mesh_index = rng.random_range(0..64);
    record.view_dist_ratio = rng.random_range(20..=200);
    record.lod_ratio = rng.random_range(0..40);
    if rng.random_bool(0.5) {
        record.render_flags = RenderFlags::CAST_SHADOW_MAPS | RenderFlags::HAS_CAST_SHADOW_MAPS;
    }
    if rng.random_bool(0.2) {
        record.render_flags |= RenderFlags::GOOD_OCCLUDER;
    }
    record
}
