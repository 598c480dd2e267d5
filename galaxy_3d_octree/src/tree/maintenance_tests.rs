use glam::Vec3;
use crate::config::TreeConfig;
use crate::math::AABB;
use crate::object::RenderFlags;
use crate::test_support::TestObject;
use super::*;

fn tree() -> SpatialTree {
    SpatialTree::new(AABB::new(Vec3::splat(-512.0), Vec3::splat(512.0)), TreeConfig::default())
}

// ============================================================================
// RELEASE EMPTY NODES
// ============================================================================

#[test]
fn test_release_without_pending_is_noop() {
    let mut tree = tree();
    tree.insert_object(TestObject::new(Vec3::ONE, 0.5).arc());
    assert_eq!(tree.release_empty_nodes(), 0);
}

#[test]
fn test_bulk_removal_reaps_in_one_batch() {
    let mut tree = tree();
    let keys: Vec<_> = (0..20)
        .map(|i| tree.insert_object(TestObject::new(Vec3::new(i as f32 * 40.0 - 400.0, 3.0, -7.0), 0.5).arc()))
        .collect();
    assert!(tree.node_count() > 20);

    for key in keys {
        tree.delete_object(key);
    }
    assert!(tree.pending_reap_count() > 0);

    tree.release_empty_nodes();
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.object_count(), 0);
}

// ============================================================================
// CLEAN UP
// ============================================================================

#[test]
fn test_clean_up_tree_shrinks_aggregates() {
    let mut tree = tree();
    let keep = tree.insert_object(TestObject::new(Vec3::new(10.0, 10.0, 10.0), 0.5).arc());
    let gone = tree.insert_object(
        TestObject::new(Vec3::new(-200.0, -200.0, -200.0), 0.5)
            .with_view_distance(400.0)
            .with_flags(RenderFlags::GOOD_OCCLUDER)
            .arc(),
    );
    tree.delete_object(gone);

    let released = tree.clean_up_tree();
    assert!(released > 0);

    let root = tree.node(tree.root()).unwrap();
    assert_eq!(root.objects_box(), tree.object(keep).unwrap().bbox());
    assert_eq!(root.max_view_distance(), 100.0);
    assert!(!root.render_flags().contains(RenderFlags::GOOD_OCCLUDER));
    assert_eq!(tree.pending_reap_count(), 0);
    assert!(tree.check_aggregates());
}

// ============================================================================
// DELETE BY FLAG / SHADOW SLICES
// ============================================================================

#[test]
fn test_delete_objects_by_flag() {
    let mut tree = tree();
    tree.insert_object(TestObject::new(Vec3::ONE, 0.5).with_flags(RenderFlags::SELECTED).arc());
    tree.insert_object(TestObject::new(Vec3::splat(30.0), 0.5).with_flags(RenderFlags::SELECTED).arc());
    let kept = tree.insert_object(TestObject::new(Vec3::splat(-30.0), 0.5).arc());

    assert_eq!(tree.delete_objects_by_flag(RenderFlags::SELECTED), 2);
    assert_eq!(tree.object_count(), 1);
    assert!(tree.object(kept).is_some());
}

#[test]
fn test_mark_shadow_cache_slice_stamps_overlapping_path() {
    let mut tree = tree();
    let near = tree.insert_object(TestObject::new(Vec3::new(10.0, 10.0, 10.0), 0.5).arc());
    let far = tree.insert_object(TestObject::new(Vec3::new(-300.0, -300.0, -300.0), 0.5).arc());

    let marked = tree.mark_shadow_cache_slice(&AABB::new(Vec3::splat(5.0), Vec3::splat(15.0)), 42);
    assert!(marked >= 2);

    let near_node = tree.node(tree.object_node(near).unwrap()).unwrap();
    let far_node = tree.node(tree.object_node(far).unwrap()).unwrap();
    assert_eq!(near_node.shadow_slice_frame(), Some(42));
    assert_eq!(far_node.shadow_slice_frame(), None);
    assert_eq!(tree.node(tree.root()).unwrap().shadow_slice_frame(), Some(42));
}
