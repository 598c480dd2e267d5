use std::sync::Arc;
use glam::Vec3;
use crate::config::TreeConfig;
use crate::math::AABB;
use crate::object::{InternalFlags, ObjectRecord, ObjectType, PersistedObject, RecordPayload};
use crate::serialize::{load_tree, save_tree, Endian, LoadOptions};
use crate::streaming::MemoryStreamSource;
use super::*;

const NEAR: Vec3 = Vec3::new(20.0, 2.0, 20.0);
const EAST: Vec3 = Vec3::new(290.0, 2.0, -300.0);
const WEST: Vec3 = Vec3::new(-300.0, 2.0, -300.0);
const FAR_AWAY: Vec3 = Vec3::new(5000.0, 0.0, 0.0);

fn world() -> AABB {
    AABB::new(Vec3::splat(-512.0), Vec3::splat(512.0))
}

fn bush(center: Vec3) -> ObjectRecord {
    ObjectRecord {
        payload: RecordPayload::Vegetation { position: center, scale: 1.0, angles: [0, 0, 0], material: 1 },
        ..ObjectRecord::new(ObjectType::Vegetation, AABB::from_center_half_extent(center, Vec3::splat(0.5)))
    }
}

/// Three clusters of four bushes, saved then loaded back with the
/// vegetation left on disk.
fn streamed_level(config: TreeConfig) -> (SpatialTree, Arc<MemoryStreamSource>) {
    let (tree, blob) = streamed_level_blob(config);
    (tree, Arc::new(MemoryStreamSource::new(blob)))
}

fn streamed_level_blob(config: TreeConfig) -> (SpatialTree, Vec<u8>) {
    let mut source_tree = SpatialTree::new(world(), TreeConfig::default());
    for cluster in [NEAR, EAST, WEST] {
        for i in 0..4 {
            let offset = Vec3::new(i as f32 * 1.5, 0.0, 0.0);
            source_tree.insert_object(Arc::new(PersistedObject::new(bush(cluster + offset))));
        }
    }
    let blob = save_tree(&source_tree, Endian::Little).unwrap();

    let mut tree = SpatialTree::new(world(), config);
    let options = LoadOptions::for_config(tree.config());
    load_tree(&mut tree, &blob, &options).unwrap();
    assert_eq!(tree.object_count(), 0);
    (tree, blob)
}

/// Node holding the streamed cluster around `point`.
fn node_near(tree: &SpatialTree, point: Vec3) -> NodeKey {
    tree.nodes()
        .find(|(_, n)| n.has_file_data() && n.node_box().contains_point(point))
        .map(|(key, _)| key)
        .unwrap()
}

fn streamed_objects(tree: &SpatialTree) -> usize {
    tree.objects()
        .filter(|(_, s)| s.internal_flags().contains(InternalFlags::STREAMED))
        .count()
}

// ============================================================================
// STATE MACHINE
// ============================================================================

#[test]
fn test_async_load_passes_through_in_progress() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source.clone());
    let node = node_near(&tree, NEAR);

    assert!(controller.check_start_streaming(&mut tree, node, false));
    assert_eq!(tree.node(node).unwrap().streaming_state(), StreamingState::InProgress);
    assert!(controller.is_in_flight(node));
    assert_eq!(source.pending_count(), 1);

    // Already in progress
    assert!(!controller.check_start_streaming(&mut tree, node, false));

    // Completed but not collected yet
    assert_eq!(source.pump(), 1);
    assert_eq!(tree.node(node).unwrap().streaming_state(), StreamingState::InProgress);

    let update = controller.update(&mut tree, FAR_AWAY);
    assert_eq!(update.completed, 1);
    assert_eq!(tree.node(node).unwrap().streaming_state(), StreamingState::Ready);
    assert_eq!(streamed_objects(&tree), 4);
    assert_eq!(controller.in_flight_count(), 0);
    assert_eq!(tree.streamed_in_nodes_count(), 1);

    // Loaded nodes are not requested again
    assert!(!controller.check_start_streaming(&mut tree, node, false));
}

#[test]
fn test_node_without_file_data_is_only_touched() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source);
    let root = tree.root();
    assert!(!tree.node(root).unwrap().has_file_data());
    assert!(!controller.check_start_streaming(&mut tree, root, true));
    assert_eq!(tree.node(root).unwrap().streaming_state(), StreamingState::NotLoaded);
}

#[test]
fn test_abort_rolls_back_to_not_loaded() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source.clone());
    let node = node_near(&tree, NEAR);

    assert!(controller.check_start_streaming(&mut tree, node, false));
    assert!(controller.abort(node));
    source.pump();

    let update = controller.update(&mut tree, FAR_AWAY);
    assert_eq!(update.aborted, 1);
    assert_eq!(update.failed, 0);
    assert_eq!(tree.node(node).unwrap().streaming_state(), StreamingState::NotLoaded);
    assert_eq!(tree.object_count(), 0);
    assert!(!controller.is_in_flight(node));

    // A later request starts over
    assert!(controller.check_start_streaming(&mut tree, node, false));
}

#[test]
fn test_abort_of_unknown_node_is_ignored() {
    let (tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source);
    assert!(!controller.abort(node_near(&tree, NEAR)));
}

#[test]
fn test_failed_read_leaves_node_in_progress() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source.clone());
    let node = node_near(&tree, NEAR);

    source.set_failing(true);
    assert!(controller.check_start_streaming(&mut tree, node, false));
    source.pump();
    let update = controller.update(&mut tree, FAR_AWAY);
    assert_eq!(update.failed, 1);
    assert_eq!(tree.node(node).unwrap().streaming_state(), StreamingState::InProgress);
    assert!(!controller.is_in_flight(node));

    // Only a forced sync load recovers it
    assert!(!controller.check_start_streaming(&mut tree, node, false));
    source.set_failing(false);
    assert!(controller.check_start_streaming(&mut tree, node, true));
    assert_eq!(tree.node(node).unwrap().streaming_state(), StreamingState::Ready);
}

#[test]
fn test_in_flight_cap() {
    let config = TreeConfig { stream_max_tasks: 1, ..TreeConfig::default() };
    let (mut tree, source) = streamed_level(config);
    let mut controller = StreamingController::new(source.clone());
    let near = node_near(&tree, NEAR);
    let east = node_near(&tree, EAST);

    assert!(controller.check_start_streaming(&mut tree, near, false));
    assert!(!controller.check_start_streaming(&mut tree, east, false));
    assert_eq!(tree.node(east).unwrap().streaming_state(), StreamingState::NotLoaded);
    assert_eq!(controller.in_flight_count(), 1);

    source.pump();
    controller.update(&mut tree, FAR_AWAY);
    assert!(controller.check_start_streaming(&mut tree, east, false));
}

#[test]
fn test_sync_load_supersedes_pending_request() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source.clone());
    let node = node_near(&tree, NEAR);

    assert!(controller.check_start_streaming(&mut tree, node, false));
    assert!(controller.check_start_streaming(&mut tree, node, true));
    assert_eq!(tree.node(node).unwrap().streaming_state(), StreamingState::Ready);
    assert_eq!(controller.in_flight_count(), 0);
    assert_eq!(streamed_objects(&tree), 4);

    // The superseded read completes as aborted and changes nothing
    source.pump();
    let update = controller.update(&mut tree, FAR_AWAY);
    assert_eq!(update.completed + update.aborted, 0);
    assert_eq!(tree.node(node).unwrap().streaming_state(), StreamingState::Ready);
    assert_eq!(streamed_objects(&tree), 4);
}

#[test]
fn test_hidden_layers_apply_to_streamed_objects() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut layers = FxHashSet::default();
    layers.insert(0u16);
    let mut controller = StreamingController::new(source).with_hidden_layers(layers);
    let node = node_near(&tree, NEAR);
    assert!(controller.check_start_streaming(&mut tree, node, true));
    assert!(tree
        .objects()
        .all(|(_, s)| s.render_flags().contains(crate::object::RenderFlags::HIDDEN)));
}

#[test]
fn test_rejected_block_is_not_requested_again() {
    let (mut tree, mut blob) = streamed_level_blob(TreeConfig::default());
    let node = node_near(&tree, NEAR);
    let (offset, _) = tree.node(node).unwrap().file_range();
    // Unknown record type tag at the head of the block
    blob[offset as usize..offset as usize + 4].copy_from_slice(&0xDEADu32.to_le_bytes());
    let source = Arc::new(MemoryStreamSource::new(blob));
    let mut controller = StreamingController::new(source.clone());

    let mut started = 0;
    let mut failed = 0;
    for _ in 0..5 {
        let update = controller.update(&mut tree, NEAR);
        started += update.started;
        failed += update.failed;
        source.pump();
    }
    assert_eq!(started, 1);
    assert_eq!(failed, 1);
    assert_eq!(tree.node(node).unwrap().streaming_state(), StreamingState::Ready);
    assert_eq!(streamed_objects(&tree), 0);

    // Eviction resets the node like any other streamed-in one
    controller.release_all(&mut tree);
    assert_eq!(tree.node(node).unwrap().streaming_state(), StreamingState::NotLoaded);
}

// ============================================================================
// PREFETCH
// ============================================================================

#[test]
fn test_prefetch_starts_only_nodes_in_reach() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source.clone());

    let update = controller.update(&mut tree, NEAR);
    assert_eq!(update.started, 1);
    assert!(controller.is_in_flight(node_near(&tree, NEAR)));
    assert!(!controller.is_in_flight(node_near(&tree, EAST)));
    assert!(!controller.is_in_flight(node_near(&tree, WEST)));

    source.pump();
    let update = controller.update(&mut tree, NEAR);
    assert_eq!(update.completed, 1);
    assert_eq!(update.started, 0);
}

#[test]
fn test_prefetch_respects_max_distance() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source);
    controller.set_max_distance(0.0);

    // 40 units from the cluster: beyond the 16 unit prediction margin
    let update = controller.update(&mut tree, NEAR + Vec3::new(0.0, 0.0, 40.0));
    assert_eq!(update.started, 0);
}

#[test]
fn test_editor_mode_prefetch_loads_synchronously() {
    let config = TreeConfig { editor_mode: true, ..TreeConfig::default() };
    let (mut tree, source) = streamed_level(config);
    let mut controller = StreamingController::new(source.clone());

    controller.update(&mut tree, NEAR);
    assert_eq!(source.pending_count(), 0);
    assert_eq!(tree.node(node_near(&tree, NEAR)).unwrap().streaming_state(), StreamingState::Ready);
}

// ============================================================================
// EVICTION
// ============================================================================

fn load_everything(tree: &mut SpatialTree, controller: &mut StreamingController) -> usize {
    let keys: Vec<NodeKey> = tree.nodes().filter(|(_, n)| n.has_file_data()).map(|(k, _)| k).collect();
    for key in &keys {
        assert!(controller.check_start_streaming(tree, *key, true));
    }
    keys.len()
}

#[test]
fn test_untouched_nodes_are_evicted_within_budget() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source);
    let loaded = load_everything(&mut tree, &mut controller);
    assert_eq!(loaded, 3);
    assert_eq!(streamed_objects(&tree), 12);

    let divisor = tree.config().eviction_budget_divisor;
    for _ in 0..20 {
        let before = controller.streamed_in_count();
        let update = controller.update(&mut tree, FAR_AWAY);
        assert!(update.eviction.tested <= before / divisor + 1);
        assert!(update.eviction.tested <= before);
    }

    assert_eq!(controller.streamed_in_count(), 0);
    assert_eq!(tree.object_count(), 0);
    assert_eq!(tree.streamed_in_nodes_count(), 0);
    for (_, node) in tree.nodes().filter(|(_, n)| n.has_file_data()) {
        assert_eq!(node.streaming_state(), StreamingState::NotLoaded);
    }
}

#[test]
fn test_recent_nodes_are_kept() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source);
    load_everything(&mut tree, &mut controller);

    // Two rounds old is still within the age limit
    for _ in 0..2 {
        let update = controller.update(&mut tree, FAR_AWAY);
        assert_eq!(update.eviction.evicted, 0);
    }
    assert_eq!(controller.streamed_in_count(), 3);
}

#[test]
fn test_eviction_continues_after_round_counter_wraps() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source);
    controller.round_id = u32::MAX - 1;
    load_everything(&mut tree, &mut controller);

    for _ in 0..20 {
        controller.update(&mut tree, FAR_AWAY);
    }
    assert!(controller.round_id() < 20);
    assert_eq!(controller.streamed_in_count(), 0);
    assert_eq!(streamed_objects(&tree), 0);
}

#[test]
fn test_touched_node_survives_eviction() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source);
    load_everything(&mut tree, &mut controller);
    let near = node_near(&tree, NEAR);

    for _ in 0..20 {
        controller.update(&mut tree, NEAR);
    }
    assert_eq!(controller.streamed_in_count(), 1);
    assert_eq!(tree.node(near).unwrap().streaming_state(), StreamingState::Ready);
    assert_eq!(streamed_objects(&tree), 4);
}

#[test]
fn test_evicted_node_streams_in_again() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source.clone());
    load_everything(&mut tree, &mut controller);
    for _ in 0..20 {
        controller.update(&mut tree, FAR_AWAY);
    }
    assert_eq!(tree.object_count(), 0);

    controller.update(&mut tree, NEAR);
    source.pump();
    let update = controller.update(&mut tree, NEAR);
    assert_eq!(update.completed, 1);
    assert_eq!(streamed_objects(&tree), 4);
}

#[test]
fn test_release_all_resets_every_node() {
    let (mut tree, source) = streamed_level(TreeConfig::default());
    let mut controller = StreamingController::new(source.clone());
    let near = node_near(&tree, NEAR);
    let east = node_near(&tree, EAST);
    assert!(controller.check_start_streaming(&mut tree, near, true));
    assert!(controller.check_start_streaming(&mut tree, east, false));

    controller.release_all(&mut tree);
    assert_eq!(controller.in_flight_count(), 0);
    assert_eq!(controller.streamed_in_count(), 0);
    assert_eq!(tree.object_count(), 0);
    assert_eq!(tree.node(near).unwrap().streaming_state(), StreamingState::NotLoaded);
    assert_eq!(tree.node(east).unwrap().streaming_state(), StreamingState::NotLoaded);

    // The orphaned read reports an abort
    source.pump();
}
