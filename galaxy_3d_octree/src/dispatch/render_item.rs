/// Render items: what the dispatcher emits for each visible object.
///
/// Items are produced out of order by content jobs and resequenced by
/// `sort_key` before submission, so the final draw order depends only on
/// the traversal.

use rdst::{RadixKey, RadixSort};
use crate::culling::CullMask;
use crate::object::{ObjectCategory, ObjectKey};
use super::sprite::SpriteState;

/// Model or sprite choice for vegetation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LodSelection {
    #[default]
    Model,
    Sprite,
    /// Cross-fade; `progress` runs from 0 to 1 toward the target
    Dissolve { to_sprite: bool, progress: f32 },
}

impl LodSelection {
    pub fn from_sprite_state(state: SpriteState, frames: u8) -> Self {
        match state {
            SpriteState::Show3D => LodSelection::Model,
            SpriteState::ShowSprite => LodSelection::Sprite,
            SpriteState::Transitioning { to_sprite, frame } => LodSelection::Dissolve {
                to_sprite,
                progress: frame as f32 / frames.max(1) as f32,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    /// Traversal node order in the high half, object order in the low half
    pub sort_key: u64,
    pub object: ObjectKey,
    pub category: ObjectCategory,
    /// Passes the object is visible in
    pub mask: CullMask,
    /// Zoom-scaled camera distance
    pub distance: f32,
    pub lod: LodSelection,
    /// Instances drawn by this item (group size for an instancing owner)
    pub instance_count: u32,
    /// `prepare_render` already ran on a worker
    pub prepared: bool,
}

impl RenderItem {
    pub const fn make_sort_key(node_order: u32, object_order: u32) -> u64 {
        ((node_order as u64) << 32) | object_order as u64
    }

    pub fn node_order(&self) -> u32 {
        (self.sort_key >> 32) as u32
    }

    pub fn is_instanced(&self) -> bool {
        self.instance_count > 1
    }
}

impl RadixKey for RenderItem {
    const LEVELS: usize = 8;

    #[inline]
    fn get_level(&self, level: usize) -> u8 {
        (self.sort_key >> (level * 8)) as u8
    }
}

/// Restore traversal order after out-of-order job completion.
pub fn sort_render_items(items: &mut Vec<RenderItem>) {
    items.radix_sort_unstable();
}

#[cfg(test)]
#[path = "render_item_tests.rs"]
mod tests;
