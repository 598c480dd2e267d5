/// StreamingController: loads and evicts per-node persisted content.
///
/// The controller is the streaming context of one loaded level. It owns the
/// stream source, the in-flight requests, the list of streamed-in nodes and
/// the round counter eviction compares against. Dropping it aborts every
/// pending read.

use std::sync::Arc;
use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::object::{InternalFlags, ObjectCategory, ObjectKey};
use crate::serialize::load_streamed_objects;
use crate::tree::{nearest_octant, NodeKey, SpatialTree, CHILD_VISIT_ORDER};
use super::stream_source::{StreamRequest, StreamSource, StreamStatus};
use super::streaming_state::StreamingState;

const SOURCE: &str = "galaxy3d::Streaming";

/// Counters of one eviction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionStats {
    /// Nodes whose round stamp was compared
    pub tested: usize,
    pub evicted: usize,
    /// Nodes still streamed in after the pass
    pub streamed_in: usize,
}

/// Counters of one `update` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingUpdate {
    pub completed: usize,
    pub aborted: usize,
    pub failed: usize,
    pub started: usize,
    pub eviction: EvictionStats,
}

pub struct StreamingController {
    source: Arc<dyn StreamSource>,
    in_flight: FxHashMap<NodeKey, Arc<StreamRequest>>,
    streamed_in: Vec<NodeKey>,
    round_id: u32,
    eviction_cursor: usize,
    hidden_layers: FxHashSet<u16>,
    max_distance: f32,
}

impl StreamingController {
    pub fn new(source: Arc<dyn StreamSource>) -> Self {
        Self {
            source,
            in_flight: FxHashMap::default(),
            streamed_in: Vec::new(),
            round_id: 0,
            eviction_cursor: 0,
            hidden_layers: FxHashSet::default(),
            max_distance: f32::MAX,
        }
    }

    /// Layers whose streamed objects load hidden.
    pub fn with_hidden_layers(mut self, layers: FxHashSet<u16>) -> Self {
        self.hidden_layers = layers;
        self
    }

    /// Upper bound on the prefetch distance, whatever the node aggregates say.
    pub fn set_max_distance(&mut self, distance: f32) {
        self.max_distance = distance.max(0.0);
    }

    pub fn round_id(&self) -> u32 {
        self.round_id
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, node_key: NodeKey) -> bool {
        self.in_flight.contains_key(&node_key)
    }

    pub fn streamed_in_count(&self) -> usize {
        self.streamed_in.len()
    }

    // ===== START =====

    /// Stamp the node as used this round and start loading its persisted
    /// content if it is not loaded yet.
    ///
    /// The asynchronous path respects the in-flight cap. The synchronous
    /// path aborts any pending read for the node and loads on the spot.
    /// Returns `true` if a load was started (async) or completed (sync).
    pub fn check_start_streaming(&mut self, tree: &mut SpatialTree, node_key: NodeKey, sync: bool) -> bool {
        let max_tasks = tree.config().stream_max_tasks;
        let round = self.round_id;
        let Some(node) = tree.node_mut(node_key) else { return false };
        node.stream_round = round;

        if !node.has_file_data() {
            return false;
        }
        match node.streaming_state() {
            StreamingState::Ready => return false,
            StreamingState::InProgress if !sync => return false,
            _ => {}
        }
        let (offset, size) = node.file_range();

        if sync {
            if let Some(request) = self.in_flight.remove(&node_key) {
                request.abort();
            }
            if node.streaming_state() == StreamingState::InProgress {
                node.set_streaming_state(StreamingState::NotLoaded);
            }
            node.set_streaming_state(StreamingState::InProgress);

            return match self.source.read_sync(offset, size) {
                Ok(bytes) => self.finish_load(tree, node_key, &bytes),
                Err(err) => {
                    crate::engine_warn!(SOURCE, "Sync load of node {:?} failed: {}", node_key, err);
                    if let Some(node) = tree.node_mut(node_key) {
                        node.set_streaming_state(StreamingState::NotLoaded);
                    }
                    false
                }
            };
        }

        if self.in_flight.len() >= max_tasks {
            return false;
        }
        node.set_streaming_state(StreamingState::InProgress);
        let request = StreamRequest::new(offset, size);
        self.in_flight.insert(node_key, Arc::clone(&request));
        self.source.start_read(request);
        crate::engine_trace!(SOURCE, "Started streaming node {:?} ({} bytes at {})", node_key, size, offset);
        true
    }

    /// Request cancellation of a pending read.
    ///
    /// The node stays `InProgress` until the next `update` collects the
    /// abort completion and rolls it back to `NotLoaded`.
    pub fn abort(&mut self, node_key: NodeKey) -> bool {
        match self.in_flight.get(&node_key) {
            Some(request) => {
                request.abort();
                true
            }
            None => false,
        }
    }

    // ===== UPDATE =====

    /// Per-frame streaming step: collect completions, prefetch around the
    /// viewpoint, advance the round, run one eviction slice.
    pub fn update(&mut self, tree: &mut SpatialTree, eye: Vec3) -> StreamingUpdate {
        let mut update = StreamingUpdate::default();
        self.poll_completions(tree, &mut update);
        update.started = self.prefetch(tree, eye);
        self.round_id = self.round_id.wrapping_add(1);
        update.eviction = self.evict(tree);
        update
    }

    fn poll_completions(&mut self, tree: &mut SpatialTree, update: &mut StreamingUpdate) {
        let done: Vec<NodeKey> = self
            .in_flight
            .iter()
            .filter(|(_, request)| request.status() != StreamStatus::Pending)
            .map(|(key, _)| *key)
            .collect();

        for node_key in done {
            let Some(request) = self.in_flight.remove(&node_key) else { continue };
            let status = if request.is_abort_requested() { StreamStatus::Aborted } else { request.status() };

            match status {
                StreamStatus::Ready => {
                    let bytes = request.take_data().unwrap_or_default();
                    if self.finish_load(tree, node_key, &bytes) {
                        update.completed += 1;
                    } else {
                        update.failed += 1;
                    }
                }
                StreamStatus::Aborted => {
                    if let Some(node) = tree.node_mut(node_key) {
                        if node.streaming_state() == StreamingState::InProgress {
                            node.set_streaming_state(StreamingState::NotLoaded);
                        }
                    }
                    crate::engine_trace!(SOURCE, "Streaming of node {:?} aborted", node_key);
                    update.aborted += 1;
                }
                StreamStatus::Failed => {
                    crate::engine_warn!(SOURCE, "Streaming of node {:?} failed, content stays unavailable", node_key);
                    update.failed += 1;
                }
                StreamStatus::Pending => {}
            }
        }
    }

    /// Decode a node's objects block and mark it `Ready`.
    fn finish_load(&mut self, tree: &mut SpatialTree, node_key: NodeKey, bytes: &[u8]) -> bool {
        match load_streamed_objects(tree, node_key, bytes, &self.hidden_layers) {
            Ok(count) => {
                if let Some(node) = tree.node_mut(node_key) {
                    node.set_streaming_state(StreamingState::Ready);
                }
                self.streamed_in.push(node_key);
                crate::engine_debug!(SOURCE, "Streamed in node {:?} ({} objects)", node_key, count);
                true
            }
            Err(err) => {
                crate::engine_error!(SOURCE, "Streamed block of node {:?} rejected: {}", node_key, err);
                drop_streamed_objects(tree, node_key);
                // Ready with no content: the block is not requested again
                // until eviction resets the node.
                if let Some(node) = tree.node_mut(node_key) {
                    node.set_streaming_state(StreamingState::Ready);
                }
                self.streamed_in.push(node_key);
                false
            }
        }
    }

    /// Walk the tree nearest octant first and start streaming every node
    /// within reach of the viewpoint.
    fn prefetch(&mut self, tree: &mut SpatialTree, eye: Vec3) -> usize {
        let prediction = tree.config().stream_prediction_distance;
        let sync = tree.config().editor_mode;
        let mut started = 0;
        let mut stack = vec![tree.root()];

        while let Some(node_key) = stack.pop() {
            let Some(node) = tree.node(node_key) else { continue };
            let reach = node.max_view_distance().min(self.max_distance) + prediction;
            if node.node_box().distance_to_point(eye) > reach {
                continue;
            }
            let children = node.children;
            let nearest = nearest_octant(node.center(), eye);
            let has_file_data = node.has_file_data();

            if has_file_data && self.check_start_streaming(tree, node_key, sync) {
                started += 1;
            }
            for offset in CHILD_VISIT_ORDER.iter().rev() {
                if let Some(child) = children[nearest ^ offset] {
                    stack.push(child);
                }
            }
        }
        started
    }

    // ===== EVICTION =====

    /// Test a bounded slice of the streamed-in nodes and drop the content
    /// of those not touched for more than `eviction_round_age` rounds.
    ///
    /// At most `len / eviction_budget_divisor + 1` nodes are tested, the
    /// slice moving round-robin over the list sorted by node size.
    pub fn evict(&mut self, tree: &mut SpatialTree) -> EvictionStats {
        let divisor = tree.config().eviction_budget_divisor.max(1);
        let age = tree.config().eviction_round_age;

        self.streamed_in
            .retain(|key| tree.node(*key).is_some_and(|n| n.streaming_state() == StreamingState::Ready));
        self.streamed_in.sort_by(|a, b| {
            let ra = tree.node(*a).map_or(0.0, |n| n.radius());
            let rb = tree.node(*b).map_or(0.0, |n| n.radius());
            ra.total_cmp(&rb)
        });

        let len = self.streamed_in.len();
        let mut stats = EvictionStats::default();
        if len == 0 {
            self.eviction_cursor = 0;
            return stats;
        }

        let budget = (len / divisor + 1).min(len);
        let mut expired = Vec::new();
        for _ in 0..budget {
            if self.eviction_cursor >= len {
                self.eviction_cursor = 0;
            }
            let node_key = self.streamed_in[self.eviction_cursor];
            self.eviction_cursor += 1;
            stats.tested += 1;

            let Some(node) = tree.node(node_key) else { continue };
            if self.round_id.wrapping_sub(node.stream_round()) > age {
                expired.push(node_key);
            }
        }

        for node_key in &expired {
            let dropped = drop_streamed_objects(tree, *node_key);
            if let Some(node) = tree.node_mut(*node_key) {
                node.set_streaming_state(StreamingState::NotLoaded);
            }
            crate::engine_debug!(SOURCE, "Evicted node {:?} ({} objects)", node_key, dropped);
        }
        if !expired.is_empty() {
            self.streamed_in.retain(|key| !expired.contains(key));
        }

        stats.evicted = expired.len();
        stats.streamed_in = self.streamed_in.len();
        stats
    }

    /// Abort every pending read and evict every streamed-in node, leaving
    /// the tree as if nothing had been streamed.
    pub fn release_all(&mut self, tree: &mut SpatialTree) {
        for (node_key, request) in self.in_flight.drain() {
            request.abort();
            if let Some(node) = tree.node_mut(node_key) {
                if node.streaming_state() == StreamingState::InProgress {
                    node.set_streaming_state(StreamingState::NotLoaded);
                }
            }
        }
        for node_key in std::mem::take(&mut self.streamed_in) {
            drop_streamed_objects(tree, node_key);
            if let Some(node) = tree.node_mut(node_key) {
                if node.streaming_state() == StreamingState::Ready {
                    node.set_streaming_state(StreamingState::NotLoaded);
                }
            }
        }
        self.eviction_cursor = 0;
    }
}

impl Drop for StreamingController {
    fn drop(&mut self) {
        for request in self.in_flight.values() {
            request.abort();
        }
    }
}

/// Delete the objects a node received from its streamed block.
fn drop_streamed_objects(tree: &mut SpatialTree, node_key: NodeKey) -> usize {
    let Some(node) = tree.node(node_key) else { return 0 };
    let streamed: Vec<ObjectKey> = ObjectCategory::ALL
        .iter()
        .flat_map(|category| node.list(*category).keys(&tree.objects))
        .filter(|key| {
            tree.object(*key)
                .is_some_and(|slot| slot.internal_flags().contains(InternalFlags::STREAMED))
        })
        .collect();

    for key in &streamed {
        tree.delete_object(*key);
    }
    streamed.len()
}

#[cfg(test)]
#[path = "streaming_controller_tests.rs"]
mod tests;
