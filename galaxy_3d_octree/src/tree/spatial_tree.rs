/// SpatialTree: the node arena plus the registry of indexed objects.
///
/// Objects are placed by a fit rule evaluated top-down: an object descends
/// while the node may subdivide, the object is small relative to the node,
/// and its view distance is short relative to the node. Every node on the
/// way down folds the object into its aggregates, so a node's aggregate
/// always covers its whole subtree.

use std::sync::Arc;
use glam::Vec3;
use slotmap::SlotMap;
use crate::config::TreeConfig;
use crate::engine_err;
use crate::error::Result;
use crate::math::aabb::point_octant;
use crate::math::AABB;
use crate::object::object_list::ObjectSlots;
use crate::object::{
    InternalFlags, ObjectCategory, ObjectKey, ObjectSlot, RenderFlags, SceneObject,
};
use crate::serialize::Endian;
use super::spatial_node::{NodeKey, NodeLifecycle, SpatialNode};

pub(crate) const SOURCE: &str = "galaxy3d::SpatialTree";

pub struct SpatialTree {
    pub(crate) nodes: SlotMap<NodeKey, SpatialNode>,
    pub(crate) objects: ObjectSlots,
    root: NodeKey,
    pub(crate) config: TreeConfig,
    /// Nodes tagged `PendingReap` (hint, recounted by each batch)
    pub(crate) pending_reap: usize,
    traversal_id: u32,
    /// Byte order of the blob the tree was loaded from
    pub(crate) persisted_endian: Option<Endian>,
}

/// `true` if an object with this center, radius and view distance belongs
/// in a child of `node`.
fn fits_deeper(config: &TreeConfig, node: &SpatialNode, center: Vec3, radius_sq: f32, max_view: f32) -> bool {
    let radius = node.radius();
    let rated = radius * config.node_size_ratio;
    node.can_subdivide(config)
        && radius_sq < rated * rated
        && max_view < radius * config.view_dist_ratio_vegetation
        && (node.parent.is_some() || node.node_box.contains_point(center))
}

impl SpatialTree {
    /// Create a tree whose root is the cube enclosing `world_box`.
    pub fn new(world_box: AABB, config: TreeConfig) -> Self {
        let half = (world_box.size() * 0.5).max_element();
        let root_box = AABB::from_center_half_extent(world_box.center(), Vec3::splat(half));

        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SpatialNode::new(root_box, None));

        Self {
            nodes,
            objects: SlotMap::with_key(),
            root,
            config,
            pending_reap: 0,
            traversal_id: 0,
            persisted_endian: None,
        }
    }

    // ===== ACCESSORS =====

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn node(&self, key: NodeKey) -> Option<&SpatialNode> {
        self.nodes.get(key)
    }

    pub(crate) fn node_mut(&mut self, key: NodeKey) -> Option<&mut SpatialNode> {
        self.nodes.get_mut(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &SpatialNode)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn object(&self, key: ObjectKey) -> Option<&ObjectSlot> {
        self.objects.get(key)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectKey, &ObjectSlot)> {
        self.objects.iter()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Node an object is linked into.
    pub fn object_node(&self, key: ObjectKey) -> Option<NodeKey> {
        self.objects.get(key).and_then(|slot| slot.node)
    }

    /// Byte order of the blob the tree was last loaded from.
    pub fn persisted_endian(&self) -> Option<Endian> {
        self.persisted_endian
    }

    /// Fresh id for the at-most-once visit marks of one traversal.
    pub(crate) fn next_traversal_id(&mut self) -> u32 {
        self.traversal_id = self.traversal_id.wrapping_add(1).max(1);
        self.traversal_id
    }

    // ===== INSERTION =====

    /// Register an object and link it into the node chosen by the fit rule.
    pub fn insert_object(&mut self, object: Arc<dyn SceneObject>) -> ObjectKey {
        let key = self.objects.insert(ObjectSlot::new(object));
        let root = self.root;
        self.insert_from(root, key);
        key
    }

    /// Register an object without linking it.
    pub(crate) fn register_object(&mut self, slot: ObjectSlot) -> ObjectKey {
        self.objects.insert(slot)
    }

    /// Descend from `start`, updating aggregates, and link at the first node
    /// that fails the fit rule. Children are created on demand.
    pub(crate) fn insert_from(&mut self, start: NodeKey, key: ObjectKey) {
        let Some(slot) = self.objects.get(key) else { return };
        let bbox = slot.bbox;
        let max_view = slot.max_view_distance;
        let flags = slot.render_flags;
        let type_bit = slot.object_type.type_bit();

        #[cfg(debug_assertions)]
        if !bbox.is_valid() || bbox.size().max_element() > self.config.huge_box_warning_size {
            crate::engine_warn!(SOURCE, "Suspicious object box {:?} (type {:?})", bbox, slot.object_type);
        }

        let center = bbox.center();
        let radius_sq = bbox.radius_sq();
        let mut node_key = start;

        loop {
            let config = &self.config;
            let Some(node) = self.nodes.get_mut(node_key) else { return };
            node.accumulate(&bbox, max_view, flags, type_bit);

            if !fits_deeper(config, node, center, radius_sq, max_view) {
                break;
            }

            let octant = point_octant(node.center, center);
            node_key = self.get_or_create_child(node_key, octant);
        }

        self.link_into(node_key, key);
    }

    /// Link an object directly at `node_key`, folding it into the node's
    /// and every ancestor's aggregates. Used by the loaders.
    pub(crate) fn link_object_at(&mut self, node_key: NodeKey, key: ObjectKey) {
        let Some(slot) = self.objects.get(key) else { return };
        let (bbox, max_view, flags, type_bit) =
            (slot.bbox, slot.max_view_distance, slot.render_flags, slot.object_type.type_bit());

        let mut cursor = Some(node_key);
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get_mut(current) else { break };
            node.accumulate(&bbox, max_view, flags, type_bit);
            cursor = node.parent;
        }

        self.link_into(node_key, key);
    }

    fn link_into(&mut self, node_key: NodeKey, key: ObjectKey) {
        let Some(node) = self.nodes.get_mut(node_key) else { return };
        let Some(slot) = self.objects.get_mut(key) else { return };
        let category = slot.category;
        let instanced = slot.internal.contains(InternalFlags::STATIC_INSTANCING);
        slot.node = Some(node_key);

        // Instanced members sit at the back so owners are met first
        let list = &mut node.lists[category.index()];
        if instanced {
            list.push_back(&mut self.objects, key);
        } else {
            list.push_front(&mut self.objects, key);
        }

        node.compiled[category.index()] = false;
        if category == ObjectCategory::Vegetation {
            node.mark_instancing_dirty();
        }
        if node.lifecycle == NodeLifecycle::PendingReap {
            node.lifecycle = NodeLifecycle::Live;
            self.pending_reap = self.pending_reap.saturating_sub(1);
        }
    }

    pub(crate) fn get_or_create_child(&mut self, node_key: NodeKey, octant: usize) -> NodeKey {
        let child_box = match self.nodes.get(node_key) {
            Some(node) => {
                if let Some(child) = node.children[octant] {
                    return child;
                }
                node.node_box.octant(node.center, octant)
            }
            None => return node_key,
        };

        let child = self.nodes.insert(SpatialNode::new(child_box, Some(node_key)));
        if let Some(node) = self.nodes.get_mut(node_key) {
            node.children[octant] = Some(child);
        }
        crate::engine_trace!(SOURCE, "Created child {} of node {:?}", octant, node_key);
        child
    }

    // ===== REMOVAL =====

    /// Unlink and forget an object. Returns `false` for a stale key.
    pub fn delete_object(&mut self, key: ObjectKey) -> bool {
        if !self.objects.contains_key(key) {
            return false;
        }
        self.unlink_object(key);
        self.objects.remove(key);
        true
    }

    /// Unlink an object from its node and queue the node if it became empty.
    pub(crate) fn unlink_object(&mut self, key: ObjectKey) -> Option<NodeKey> {
        let slot = self.objects.get_mut(key)?;
        let node_key = slot.node.take()?;
        let category = slot.category;
        let was_instanced = slot
            .internal
            .intersects(InternalFlags::STATIC_INSTANCING | InternalFlags::INSTANCING_OWNER);
        slot.internal.remove(InternalFlags::STATIC_INSTANCING | InternalFlags::INSTANCING_OWNER);

        let node = self.nodes.get_mut(node_key)?;
        node.lists[category.index()].unlink(&mut self.objects, key);
        node.compiled[category.index()] = false;
        node.casters.retain(|&k| k != key);
        if category == ObjectCategory::Vegetation || was_instanced {
            node.mark_instancing_dirty();
        }

        self.queue_if_empty(node_key);
        Some(node_key)
    }

    /// Tag an emptied node for the next reap batch.
    pub(crate) fn queue_if_empty(&mut self, node_key: NodeKey) {
        let Some(node) = self.nodes.get_mut(node_key) else { return };
        if !node.is_empty() || node.lifecycle == NodeLifecycle::PendingReap {
            return;
        }
        node.lifecycle = NodeLifecycle::PendingReap;
        self.pending_reap += 1;

        if self.config.editor_mode {
            self.release_empty_nodes();
        }
    }

    // ===== UPDATE =====

    /// Re-read an object's bounds and flags after it moved or changed.
    ///
    /// The object stays where it is if its node is still the right one,
    /// otherwise it is unlinked and inserted again from the root.
    pub fn update_object(&mut self, key: ObjectKey) -> Result<NodeKey> {
        let slot = self
            .objects
            .get_mut(key)
            .ok_or_else(|| engine_err!(SOURCE, "update_object: unknown object {:?}", key))?;
        slot.refresh();

        if let Some(node_key) = slot.node {
            if self.is_right_node(node_key, key) {
                self.refresh_aggregates_upwards(node_key, key);
                return Ok(node_key);
            }
        }

        self.unlink_object(key);
        let root = self.root;
        self.insert_from(root, key);
        self.object_node(key)
            .ok_or_else(|| engine_err!(SOURCE, "update_object: object {:?} was not relinked", key))
    }

    fn refresh_aggregates_upwards(&mut self, node_key: NodeKey, key: ObjectKey) {
        let Some(slot) = self.objects.get(key) else { return };
        let (bbox, max_view, flags, type_bit, category) = (
            slot.bbox,
            slot.max_view_distance,
            slot.render_flags,
            slot.object_type.type_bit(),
            slot.category,
        );

        if let Some(node) = self.nodes.get_mut(node_key) {
            node.compiled[category.index()] = false;
        }
        let mut cursor = Some(node_key);
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get_mut(current) else { break };
            node.accumulate(&bbox, max_view, flags, type_bit);
            cursor = node.parent;
        }
    }

    /// Check that `node_key` is where the fit rule would place `object_key`:
    /// the object's center lies in the node box (below the root), the
    /// objects box encloses it, it is not too big for the node, and it
    /// would not have descended further.
    pub fn is_right_node(&self, node_key: NodeKey, object_key: ObjectKey) -> bool {
        let (Some(node), Some(slot)) = (self.nodes.get(node_key), self.objects.get(object_key)) else {
            return false;
        };

        let bbox = slot.bbox;
        let center = bbox.center();
        let radius_sq = bbox.radius_sq();
        let has_parent = node.parent.is_some();
        let center_inside = node.node_box.contains_point(center);

        if has_parent && !center_inside {
            return false;
        }
        if !node.objects_box.contains(&bbox) {
            return false;
        }

        let rated = node.radius() * self.config.node_size_ratio;
        let rated_sq = rated * rated;

        // Too big: would not have descended from the parent
        if has_parent && radius_sq > rated_sq * 4.0 {
            return false;
        }
        // Too small: should have descended into a child
        if fits_deeper(&self.config, node, center, radius_sq, slot.max_view_distance) {
            return false;
        }

        true
    }

    /// Objects box, view distance and type mask of every node cover the
    /// objects linked anywhere below it, and every list is well formed.
    pub fn check_aggregates(&self) -> bool {
        for (_, node) in self.nodes.iter() {
            if !node.lists.iter().all(|list| list.is_consistent(&self.objects)) {
                return false;
            }
        }

        for (key, slot) in self.objects.iter() {
            let mut cursor = slot.node;
            if cursor.is_none() {
                continue;
            }
            while let Some(node_key) = cursor {
                let Some(node) = self.nodes.get(node_key) else { return false };
                if !node.objects_box.contains(&slot.bbox)
                    || node.max_view_distance < slot.max_view_distance
                    || node.linked_types & slot.object_type.type_bit() == 0
                {
                    crate::engine_warn!(SOURCE, "Aggregate of node {:?} misses object {:?}", node_key, key);
                    return false;
                }
                if slot.render_flags.contains(RenderFlags::CAST_SHADOW_MAPS)
                    && !node.render_flags.contains(RenderFlags::HAS_CAST_SHADOW_MAPS)
                {
                    return false;
                }
                cursor = node.parent;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "spatial_tree_tests.rs"]
mod tests;
