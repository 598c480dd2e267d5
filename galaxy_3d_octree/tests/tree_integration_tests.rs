//! Integration tests for the spatial tree
//!
//! Seeded randomized scenes checked against the tree invariants: aggregates
//! cover their subtree, every object sits in the node its fit rule picks,
//! removals reap back to the root. No GPU required.
//!
//! Run with: cargo test --test tree_integration_tests

mod test_utils;

use std::sync::Arc;
use galaxy_3d_octree::galaxy3d::{SpatialTree, TreeConfig};
use galaxy_3d_octree::galaxy3d::math::AABB;
use galaxy_3d_octree::galaxy3d::object::{ObjectCategory, ObjectKey, ObjectType, RenderFlags};
use galaxy_3d_octree::glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_utils::{random_box, random_prop, world, Prop};

fn random_tree(seed: u64, count: usize) -> (SpatialTree, Vec<(ObjectKey, Arc<Prop>)>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut tree = SpatialTree::new(world(), TreeConfig::default());
    let props = (0..count)
        .map(|_| {
            let prop = random_prop(&mut rng);
            (tree.insert_object(prop.clone()), prop)
        })
        .collect();
    (tree, props)
}

fn assert_fit(tree: &SpatialTree) {
    for (key, slot) in tree.objects() {
        let node = slot.node().expect("object is linked");
        assert!(tree.is_right_node(node, key), "object {:?} misplaced", key);
    }
}

// ============================================================================
// INSERTION
// ============================================================================

#[test]
fn test_integration_random_insertions_keep_invariants() {
    for seed in 0..8 {
        let (tree, props) = random_tree(seed, 300);
        assert_eq!(tree.object_count(), props.len());
        assert!(tree.check_aggregates(), "seed {}", seed);
        assert_fit(&tree);
    }
}

#[test]
fn test_integration_category_counts_add_up() {
    let (tree, props) = random_tree(42, 200);
    let total: usize = ObjectCategory::ALL.iter().map(|c| tree.objects_count(*c)).sum();
    assert_eq!(total, props.len());
}

// ============================================================================
// UPDATE AND REMOVAL
// ============================================================================

#[test]
fn test_integration_moves_and_deletes_keep_invariants() {
    let mut rng = StdRng::seed_from_u64(7);
    let (mut tree, mut props) = random_tree(7, 250);

    for round in 0..6 {
        for (key, prop) in props.iter() {
            if rng.random_bool(0.3) {
                prop.move_to(random_box(&mut rng));
                tree.update_object(*key).unwrap();
            }
        }
        let mut index = 0;
        while index < props.len() {
            if rng.random_bool(0.1) {
                let (key, _) = props.swap_remove(index);
                assert!(tree.delete_object(key));
            } else {
                index += 1;
            }
        }
        if round % 2 == 1 {
            tree.release_empty_nodes();
        }

        assert_eq!(tree.object_count(), props.len());
        assert!(tree.check_aggregates(), "round {}", round);
        assert_fit(&tree);
    }
}

#[test]
fn test_integration_stale_handles_are_rejected() {
    let (mut tree, props) = random_tree(3, 10);
    let (key, _) = props[0];
    assert!(tree.delete_object(key));
    assert!(!tree.delete_object(key));
    assert!(tree.object(key).is_none());
    assert!(tree.update_object(key).is_err());
}

#[test]
fn test_integration_deleting_everything_reaps_to_root() {
    let (mut tree, props) = random_tree(11, 150);
    assert!(tree.node_count() > 1);
    for (key, _) in &props {
        tree.delete_object(*key);
    }
    tree.release_empty_nodes();
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.pending_reap_count(), 0);
}

#[test]
fn test_integration_delete_by_flag() {
    let (mut tree, props) = random_tree(5, 120);
    let casters = props
        .iter()
        .filter(|(key, _)| tree.object(*key).unwrap().render_flags().contains(RenderFlags::CAST_SHADOW_MAPS))
        .count();
    assert_eq!(tree.delete_objects_by_flag(RenderFlags::CAST_SHADOW_MAPS), casters);
    assert_eq!(tree.object_count(), props.len() - casters);
    assert!(tree.check_aggregates());
}

#[test]
fn test_integration_clean_up_keeps_content() {
    let (mut tree, props) = random_tree(9, 150);
    for (key, _) in props.iter().step_by(2) {
        tree.delete_object(*key);
    }
    tree.clean_up_tree();
    assert_eq!(tree.pending_reap_count(), 0);
    assert!(tree.check_aggregates());
    assert_fit(&tree);
    for (_, node) in tree.nodes() {
        assert!(node.is_root() || node.has_objects() || node.has_children());
    }
}

// ============================================================================
// QUERIES
// ============================================================================

#[test]
fn test_integration_box_query_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(21);
    let (tree, _) = random_tree(21, 300);

    for _ in 0..40 {
        let center = Vec3::new(
            rng.random_range(-400.0..400.0),
            rng.random_range(-50.0..50.0),
            rng.random_range(-400.0..400.0),
        );
        let query = AABB::from_center_half_extent(center, Vec3::splat(rng.random_range(5.0..120.0)));

        let mut found = Vec::new();
        tree.get_objects_in_box(&query, &mut found);
        found.sort();
        let mut expected: Vec<ObjectKey> = tree
            .objects()
            .filter(|(_, slot)| slot.bbox().intersects(&query))
            .map(|(key, _)| key)
            .collect();
        expected.sort();
        assert_eq!(found, expected);

        let lights = expected
            .iter()
            .any(|key| tree.object(*key).unwrap().object_type() == ObjectType::Light);
        assert_eq!(tree.is_object_type_in_box(ObjectType::Light, &query), lights);
    }
}

#[test]
fn test_integration_empty_tree_queries() {
    let tree = SpatialTree::new(world(), TreeConfig::default());
    let query = AABB::from_center_half_extent(Vec3::ZERO, Vec3::splat(100.0));

    let mut found = Vec::new();
    tree.get_objects_in_box(&query, &mut found);
    tree.get_objects_by_type(ObjectType::Brush, None, &mut found);
    tree.get_objects_by_flags(RenderFlags::empty(), &mut found);
    assert!(found.is_empty());
    assert!(!tree.is_object_type_in_box(ObjectType::Light, &query));
    assert_eq!(tree.find_node_containing_box(&query), Some(tree.root()));
    assert!(tree.streaming_ready_in_box(&query));
    assert_eq!(tree.streamed_in_nodes_count(), 0);
    assert!(tree.check_aggregates());
}
