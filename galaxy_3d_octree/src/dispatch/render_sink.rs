/// Draw submission seam.
///
/// The sink receives items on the thread that called the frame driver, in
/// sort-key order. Draw-call emission stays single threaded.

use crate::object::SceneObject;
use super::render_item::RenderItem;

pub trait RenderSink {
    fn submit(&mut self, item: &RenderItem, object: &dyn SceneObject);
}

/// Sink that keeps every submitted item
#[derive(Debug, Default)]
pub struct CollectingSink {
    items: Vec<RenderItem>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl RenderSink for CollectingSink {
    fn submit(&mut self, item: &RenderItem, _object: &dyn SceneObject) {
        self.items.push(*item);
    }
}
