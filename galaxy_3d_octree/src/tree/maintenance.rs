//! Batched reaping of empty nodes and whole-tree upkeep.

use crate::math::AABB;
use crate::object::{ObjectCategory, ObjectKey, RenderFlags};
use super::spatial_node::{NodeKey, NodeLifecycle};
use super::spatial_tree::{SpatialTree, SOURCE};

impl SpatialTree {
    /// Release every node tagged `PendingReap` that is still empty.
    ///
    /// Smaller nodes go first so children are released before their
    /// parents; a parent emptied by the release is handled in the same batch.
    pub fn release_empty_nodes(&mut self) -> usize {
        if self.pending_reap == 0 {
            return 0;
        }

        let mut pending: Vec<NodeKey> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.lifecycle == NodeLifecycle::PendingReap)
            .map(|(key, _)| key)
            .collect();
        pending.sort_by(|a, b| {
            let ra = self.nodes.get(*a).map_or(0.0, |n| n.radius());
            let rb = self.nodes.get(*b).map_or(0.0, |n| n.radius());
            ra.total_cmp(&rb)
        });

        let mut released = 0;
        let mut index = 0;
        while index < pending.len() {
            let key = pending[index];
            index += 1;

            let Some(node) = self.nodes.get_mut(key) else { continue };
            if node.lifecycle != NodeLifecycle::PendingReap {
                continue;
            }
            if !node.is_empty() {
                node.lifecycle = NodeLifecycle::Live;
                continue;
            }

            let parent = node.parent;
            self.nodes.remove(key);
            released += 1;

            let Some(parent_key) = parent else { continue };
            if let Some(parent) = self.nodes.get_mut(parent_key) {
                for child in parent.children.iter_mut() {
                    if *child == Some(key) {
                        *child = None;
                    }
                }
                if parent.is_empty() && parent.lifecycle == NodeLifecycle::Live {
                    parent.lifecycle = NodeLifecycle::PendingReap;
                    pending.push(parent_key);
                }
            }
        }

        self.pending_reap = self
            .nodes
            .values()
            .filter(|n| n.lifecycle == NodeLifecycle::PendingReap)
            .count();

        if released > 0 {
            crate::engine_debug!(SOURCE, "Released {} empty nodes", released);
        }
        released
    }

    /// Number of nodes waiting for the next reap batch.
    pub fn pending_reap_count(&self) -> usize {
        self.pending_reap
    }

    /// Recompute every aggregate bottom-up from the linked objects and drop
    /// subtrees holding nothing. Returns the number of released nodes.
    pub fn clean_up_tree(&mut self) -> usize {
        let root = self.root();
        let mut released = 0;
        self.recompute_subtree(root, &mut released);
        self.pending_reap = self
            .nodes
            .values()
            .filter(|n| n.lifecycle == NodeLifecycle::PendingReap)
            .count();
        crate::engine_info!(SOURCE, "Tree clean-up released {} nodes", released);
        released
    }

    /// Returns `true` if the subtree still holds anything.
    fn recompute_subtree(&mut self, key: NodeKey, released: &mut usize) -> bool {
        let children: Vec<(usize, NodeKey)> = match self.nodes.get(key) {
            Some(node) => node.children().collect(),
            None => return false,
        };

        for (octant, child) in children {
            if !self.recompute_subtree(child, released) {
                self.nodes.remove(child);
                *released += 1;
                if let Some(node) = self.nodes.get_mut(key) {
                    node.children[octant] = None;
                }
            }
        }

        let Some(node) = self.nodes.get(key) else { return false };
        let mut objects_box = node.stream_box;
        let mut max_view = node.stream_view_distance;
        let mut flags = RenderFlags::empty();
        let mut types = 0u32;

        for category in ObjectCategory::ALL {
            for (_, slot) in node.list(category).iter(&self.objects) {
                objects_box.add_box(&slot.bbox);
                max_view = max_view.max(slot.max_view_distance);
                flags |= slot.render_flags & RenderFlags::AGGREGATED;
                if slot.render_flags.contains(RenderFlags::CAST_SHADOW_MAPS) {
                    flags |= RenderFlags::HAS_CAST_SHADOW_MAPS;
                }
                types |= slot.object_type.type_bit();
            }
        }
        if !node.casters.is_empty() {
            flags |= RenderFlags::CAST_SHADOW_MAPS | RenderFlags::HAS_CAST_SHADOW_MAPS;
        }
        for (_, child) in node.children() {
            if let Some(child) = self.nodes.get(child) {
                if child.objects_box.is_valid() {
                    objects_box.add_box(&child.objects_box);
                }
                max_view = max_view.max(child.max_view_distance);
                flags |= child.render_flags;
                types |= child.linked_types;
            }
        }

        let has_content = node.has_objects() || node.has_children() || node.has_file_data();
        let is_root = node.is_root();

        if let Some(node) = self.nodes.get_mut(key) {
            node.objects_box = objects_box;
            node.max_view_distance = max_view;
            node.render_flags = flags;
            node.linked_types = types;
            if has_content {
                node.lifecycle = NodeLifecycle::Live;
            }
        }
        has_content || is_root
    }

    /// Delete every object carrying all of `flags`. Returns the count.
    pub fn delete_objects_by_flag(&mut self, flags: RenderFlags) -> usize {
        let mut doomed: Vec<ObjectKey> = Vec::new();
        self.get_objects_by_flags(flags, &mut doomed);
        for &key in &doomed {
            self.delete_object(key);
        }
        doomed.len()
    }

    /// Stamp nodes overlapping `bbox` so cached shadow cascades refresh
    /// them during `frame_id`. Returns the number of stamped nodes.
    pub fn mark_shadow_cache_slice(&mut self, bbox: &AABB, frame_id: u32) -> usize {
        let mut marked = Vec::new();
        self.visit_nodes(|key, node| {
            if !node.objects_box.intersects(bbox) {
                return false;
            }
            marked.push(key);
            true
        });
        for &key in &marked {
            if let Some(node) = self.nodes.get_mut(key) {
                node.shadow_slice_frame = Some(frame_id);
            }
        }
        marked.len()
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
