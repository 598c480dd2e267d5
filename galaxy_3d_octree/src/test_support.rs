//! Scene object stand-ins shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use glam::Vec3;
use crate::dispatch::RenderItem;
use crate::math::AABB;
use crate::object::{MaterialId, MeshId, ObjectType, RenderFlags, SceneObject};

pub struct TestObject {
    bbox: Mutex<AABB>,
    object_type: ObjectType,
    flags: RenderFlags,
    max_view: f32,
    mesh: Option<MeshId>,
    material: Option<MaterialId>,
    job: bool,
    sprite: Option<f32>,
    layer: u16,
    prepared: AtomicUsize,
}

impl TestObject {
    /// Brush cube with a short view distance.
    pub fn new(center: Vec3, half: f32) -> Self {
        Self {
            bbox: Mutex::new(AABB::from_center_half_extent(center, Vec3::splat(half))),
            object_type: ObjectType::Brush,
            flags: RenderFlags::empty(),
            max_view: 100.0,
            mesh: None,
            material: None,
            job: false,
            sprite: None,
            layer: 0,
            prepared: AtomicUsize::new(0),
        }
    }

    pub fn with_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = object_type;
        self
    }

    pub fn with_flags(mut self, flags: RenderFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_view_distance(mut self, max_view: f32) -> Self {
        self.max_view = max_view;
        self
    }

    pub fn with_mesh(mut self, mesh: MeshId, material: MaterialId) -> Self {
        self.mesh = Some(mesh);
        self.material = Some(material);
        self
    }

    pub fn as_job(mut self) -> Self {
        self.job = true;
        self
    }

    pub fn with_sprite(mut self, switch_distance: f32) -> Self {
        self.sprite = Some(switch_distance);
        self
    }

    pub fn with_layer(mut self, layer: u16) -> Self {
        self.layer = layer;
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_bbox(&self, bbox: AABB) {
        *self.bbox.lock().unwrap() = bbox;
    }

    pub fn prepared_count(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }
}

impl SceneObject for TestObject {
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

    fn layer_id(&self) -> u16 {
        self.layer
    }

    fn mesh_id(&self) -> Option<MeshId> {
        self.mesh
    }

    fn material_id(&self) -> Option<MaterialId> {
        self.material
    }

    fn can_render_as_job(&self) -> bool {
        self.job
    }

    fn sprite_switch_distance(&self) -> Option<f32> {
        self.sprite
    }

    fn prepare_render(&self, _item: &RenderItem) {
        self.prepared.fetch_add(1, Ordering::SeqCst);
    }
}
