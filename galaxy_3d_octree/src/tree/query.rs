//! Read-only queries over the tree.

use crate::math::AABB;
use crate::object::{ObjectCategory, ObjectKey, ObjectType, RenderFlags};
use crate::streaming::StreamingState;
use super::spatial_node::{NodeKey, SpatialNode};
use super::spatial_tree::SpatialTree;

impl SpatialTree {
    /// Depth-first walk from the root. `visit` returns `false` to skip the
    /// node's children.
    pub fn visit_nodes<F>(&self, mut visit: F)
    where
        F: FnMut(NodeKey, &SpatialNode) -> bool,
    {
        let mut stack = vec![self.root()];
        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(key) else { continue };
            if visit(key, node) {
                stack.extend(node.children.iter().rev().flatten().copied());
            }
        }
    }

    /// Objects of one type, optionally restricted to those overlapping `bbox`.
    ///
    /// Subtrees that never linked the type are skipped.
    pub fn get_objects_by_type(&self, object_type: ObjectType, bbox: Option<&AABB>, out: &mut Vec<ObjectKey>) {
        let type_bit = object_type.type_bit();
        let category = object_type.category();

        self.visit_nodes(|_, node| {
            if node.linked_types & type_bit == 0 {
                return false;
            }
            if let Some(bbox) = bbox {
                if !node.objects_box.intersects(bbox) {
                    return false;
                }
            }
            for (key, slot) in node.list(category).iter(&self.objects) {
                if slot.object_type == object_type && bbox.map_or(true, |b| b.intersects(&slot.bbox)) {
                    out.push(key);
                }
            }
            true
        });
    }

    /// Objects carrying every flag in `flags`.
    pub fn get_objects_by_flags(&self, flags: RenderFlags, out: &mut Vec<ObjectKey>) {
        self.visit_nodes(|_, node| {
            for category in ObjectCategory::ALL {
                for (key, slot) in node.list(category).iter(&self.objects) {
                    if slot.render_flags.contains(flags) {
                        out.push(key);
                    }
                }
            }
            true
        });
    }

    /// Objects whose bounds overlap `bbox`.
    pub fn get_objects_in_box(&self, bbox: &AABB, out: &mut Vec<ObjectKey>) {
        self.visit_nodes(|_, node| {
            if !node.objects_box.intersects(bbox) {
                return false;
            }
            for category in ObjectCategory::ALL {
                for (key, slot) in node.list(category).iter(&self.objects) {
                    if slot.bbox.intersects(bbox) {
                        out.push(key);
                    }
                }
            }
            true
        });
    }

    pub fn is_object_type_in_box(&self, object_type: ObjectType, bbox: &AABB) -> bool {
        let mut found = Vec::new();
        self.get_objects_by_type(object_type, Some(bbox), &mut found);
        !found.is_empty()
    }

    /// Linked objects of one category across the whole tree.
    pub fn objects_count(&self, category: ObjectCategory) -> usize {
        self.nodes.values().map(|node| node.list(category).len()).sum()
    }

    /// Deepest existing node whose node box encloses `bbox`.
    pub fn find_node_containing_box(&self, bbox: &AABB) -> Option<NodeKey> {
        let mut current = self.root();
        if !self.nodes.get(current)?.node_box.contains(bbox) {
            return None;
        }
        'descend: loop {
            let node = self.nodes.get(current)?;
            for (_, child) in node.children() {
                if self.nodes.get(child).is_some_and(|c| c.node_box.contains(bbox)) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// `true` if every node overlapping `bbox` with persisted content has it
    /// loaded.
    pub fn streaming_ready_in_box(&self, bbox: &AABB) -> bool {
        let mut ready = true;
        self.visit_nodes(|_, node| {
            if !ready || !node.node_box.intersects(bbox) {
                return false;
            }
            if node.has_file_data() && node.streaming != StreamingState::Ready {
                ready = false;
            }
            true
        });
        ready
    }

    /// Nodes whose persisted content is currently loaded.
    pub fn streamed_in_nodes_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| n.has_file_data() && n.streaming == StreamingState::Ready)
            .count()
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
