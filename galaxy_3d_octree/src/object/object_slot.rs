/// Registration record the tree keeps for each indexed object.
///
/// Holds the cached capability values the hot paths read, the owning node
/// and the list linkage. Objects themselves never see any of this.

use std::sync::Arc;
use slotmap::new_key_type;
use crate::dispatch::SpriteState;
use crate::math::AABB;
use crate::tree::NodeKey;
use super::scene_object::{InternalFlags, ObjectCategory, ObjectType, RenderFlags, SceneObject};

new_key_type! {
    /// Stable handle of a registered object.
    ///
    /// A key becomes invalid when its object is deleted from the tree;
    /// stale keys are rejected by every lookup.
    pub struct ObjectKey;
}

/// Intrusive list linkage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListLinks {
    pub prev: Option<ObjectKey>,
    pub next: Option<ObjectKey>,
}

pub struct ObjectSlot {
    pub(crate) object: Arc<dyn SceneObject>,
    pub(crate) object_type: ObjectType,
    pub(crate) category: ObjectCategory,
    pub(crate) bbox: AABB,
    pub(crate) max_view_distance: f32,
    pub(crate) render_flags: RenderFlags,
    pub(crate) internal: InternalFlags,
    pub(crate) node: Option<NodeKey>,
    pub(crate) links: ListLinks,
    pub(crate) sprite: SpriteState,
}

impl ObjectSlot {
    pub fn new(object: Arc<dyn SceneObject>) -> Self {
        let object_type = object.object_type();
        Self {
            bbox: object.bbox(),
            max_view_distance: object.max_view_distance(),
            render_flags: object.render_flags(),
            object_type,
            category: object_type.category(),
            internal: InternalFlags::empty(),
            node: None,
            links: ListLinks::default(),
            sprite: SpriteState::default(),
            object,
        }
    }

    /// Re-read bounds, flags and view distance from the object.
    pub(crate) fn refresh(&mut self) {
        self.bbox = self.object.bbox();
        self.max_view_distance = self.object.max_view_distance();
        self.render_flags = self.object.render_flags();
    }

    pub fn object(&self) -> &Arc<dyn SceneObject> {
        &self.object
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn category(&self) -> ObjectCategory {
        self.category
    }

    pub fn bbox(&self) -> &AABB {
        &self.bbox
    }

    pub fn max_view_distance(&self) -> f32 {
        self.max_view_distance
    }

    pub fn render_flags(&self) -> RenderFlags {
        self.render_flags
    }

    pub fn internal_flags(&self) -> InternalFlags {
        self.internal
    }

    /// Node the object is linked into
    pub fn node(&self) -> Option<NodeKey> {
        self.node
    }

    pub fn sprite_state(&self) -> SpriteState {
        self.sprite
    }
}
