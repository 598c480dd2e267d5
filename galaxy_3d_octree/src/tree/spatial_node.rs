/// SpatialNode: one cell of the 8-ary spatial partition.
///
/// Nodes live in the `SpatialTree` arena and refer to each other through
/// `NodeKey`s. The node box is fixed at creation; everything else is
/// aggregate or maintenance state kept current by the tree.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use glam::Vec3;
use slotmap::new_key_type;
use crate::config::TreeConfig;
use crate::instancing::StaticInstancingInfo;
use crate::math::AABB;
use crate::object::{ObjectCategory, ObjectKey, ObjectList, RenderFlags, CATEGORY_COUNT};
use crate::streaming::StreamingState;

new_key_type! {
    /// Stable handle of a node in the tree arena.
    pub struct NodeKey;
}

/// Arena lifecycle tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLifecycle {
    Live,
    /// Empty and waiting for the next `release_empty_nodes` batch
    PendingReap,
}

pub struct SpatialNode {
    pub(crate) node_box: AABB,
    pub(crate) center: Vec3,
    pub(crate) objects_box: AABB,
    pub(crate) children: [Option<NodeKey>; 8],
    pub(crate) parent: Option<NodeKey>,
    pub(crate) lists: [ObjectList; CATEGORY_COUNT],

    // Aggregates, never smaller than any descendant's
    pub(crate) max_view_distance: f32,
    pub(crate) render_flags: RenderFlags,
    pub(crate) linked_types: u32,

    pub(crate) compiled: [bool; CATEGORY_COUNT],
    pub(crate) casters: Vec<ObjectKey>,

    // Streaming
    pub(crate) streaming: StreamingState,
    pub(crate) file_offset: u64,
    pub(crate) file_size: u32,
    /// Bounds and view distance reserved for content still on disk
    pub(crate) stream_box: AABB,
    pub(crate) stream_view_distance: f32,
    pub(crate) stream_round: u32,

    pub(crate) instancing: RwLock<Option<StaticInstancingInfo>>,
    pub(crate) instancing_dirty: AtomicBool,

    pub(crate) one_pass_mark: u32,
    pub(crate) shadow_slice_frame: Option<u32>,
    pub(crate) sprite_frame: Option<u32>,
    pub(crate) lifecycle: NodeLifecycle,
    /// Guards content dispatch when traversals of different trees overlap
    pub(crate) content_lock: Mutex<()>,
}

impl SpatialNode {
    pub(crate) fn new(node_box: AABB, parent: Option<NodeKey>) -> Self {
        Self {
            center: node_box.center(),
            node_box,
            objects_box: AABB::RESET,
            children: [None; 8],
            parent,
            lists: [ObjectList::default(); CATEGORY_COUNT],
            max_view_distance: 0.0,
            render_flags: RenderFlags::empty(),
            linked_types: 0,
            compiled: [true; CATEGORY_COUNT],
            casters: Vec::new(),
            streaming: StreamingState::NotLoaded,
            file_offset: 0,
            file_size: 0,
            stream_box: AABB::RESET,
            stream_view_distance: 0.0,
            stream_round: 0,
            instancing: RwLock::new(None),
            instancing_dirty: AtomicBool::new(false),
            one_pass_mark: 0,
            shadow_slice_frame: None,
            sprite_frame: None,
            lifecycle: NodeLifecycle::Live,
            content_lock: Mutex::new(()),
        }
    }

    // ===== GEOMETRY =====

    pub fn node_box(&self) -> &AABB {
        &self.node_box
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn half_extent(&self) -> Vec3 {
        self.node_box.max - self.center
    }

    /// Axis radius used by the fit rule (nodes are cubes)
    pub fn radius(&self) -> f32 {
        self.half_extent().x
    }

    pub fn can_subdivide(&self, config: &TreeConfig) -> bool {
        self.radius() * 2.0 > config.node_min_size
    }

    // ===== STRUCTURE =====

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn child(&self, octant: usize) -> Option<NodeKey> {
        self.children[octant]
    }

    pub fn children(&self) -> impl Iterator<Item = (usize, NodeKey)> + '_ {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(octant, child)| child.map(|c| (octant, c)))
    }

    pub fn has_children(&self) -> bool {
        self.children.iter().any(Option::is_some)
    }

    pub fn list(&self, category: ObjectCategory) -> &ObjectList {
        &self.lists[category.index()]
    }

    pub fn object_count(&self) -> usize {
        self.lists.iter().map(ObjectList::len).sum()
    }

    pub fn has_objects(&self) -> bool {
        self.lists.iter().any(|l| !l.is_empty())
    }

    /// Non-root node with no children, no objects and no persisted content.
    pub fn is_empty(&self) -> bool {
        self.parent.is_some() && !self.has_children() && !self.has_objects() && !self.has_file_data()
    }

    pub fn lifecycle(&self) -> NodeLifecycle {
        self.lifecycle
    }

    // ===== AGGREGATES =====

    pub fn objects_box(&self) -> &AABB {
        &self.objects_box
    }

    pub fn max_view_distance(&self) -> f32 {
        self.max_view_distance
    }

    pub fn render_flags(&self) -> RenderFlags {
        self.render_flags
    }

    pub fn linked_types(&self) -> u32 {
        self.linked_types
    }

    /// Fold one object's contribution into the aggregates.
    pub(crate) fn accumulate(&mut self, bbox: &AABB, max_view: f32, flags: RenderFlags, type_bit: u32) {
        self.objects_box.add_box(bbox);
        self.max_view_distance = self.max_view_distance.max(max_view);
        self.render_flags |= flags & RenderFlags::AGGREGATED;
        if flags.contains(RenderFlags::CAST_SHADOW_MAPS) {
            self.render_flags |= RenderFlags::HAS_CAST_SHADOW_MAPS;
        }
        self.linked_types |= type_bit;
    }

    pub fn is_compiled(&self, category: ObjectCategory) -> bool {
        self.compiled[category.index()]
    }

    pub fn casters(&self) -> &[ObjectKey] {
        &self.casters
    }

    // ===== STREAMING =====

    pub fn streaming_state(&self) -> StreamingState {
        self.streaming
    }

    pub(crate) fn set_streaming_state(&mut self, next: StreamingState) {
        debug_assert!(
            self.streaming.can_transition_to(next),
            "illegal streaming transition {:?} -> {:?}",
            self.streaming,
            next
        );
        self.streaming = next;
    }

    pub fn has_file_data(&self) -> bool {
        self.file_size > 0
    }

    pub fn file_range(&self) -> (u64, u32) {
        (self.file_offset, self.file_size)
    }

    pub fn stream_round(&self) -> u32 {
        self.stream_round
    }

    // ===== INSTANCING =====

    pub fn mark_instancing_dirty(&self) {
        self.instancing_dirty.store(true, Ordering::Release);
    }

    pub fn is_instancing_dirty(&self) -> bool {
        self.instancing_dirty.load(Ordering::Acquire)
    }

    /// Number of promoted instancing groups.
    pub fn instancing_group_count(&self) -> usize {
        match self.instancing.read() {
            Ok(info) => info.as_ref().map_or(0, |i| i.group_count()),
            Err(_) => 0,
        }
    }

    pub fn one_pass_mark(&self) -> u32 {
        self.one_pass_mark
    }

    pub fn shadow_slice_frame(&self) -> Option<u32> {
        self.shadow_slice_frame
    }
}
