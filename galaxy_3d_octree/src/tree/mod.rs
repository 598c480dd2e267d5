pub mod spatial_node;
pub mod spatial_tree;
mod compile;
mod query;
mod maintenance;

pub use spatial_node::{NodeKey, NodeLifecycle, SpatialNode};
pub use spatial_tree::SpatialTree;

use glam::Vec3;
use crate::math::aabb::point_octant;

/// XOR offsets applied to the nearest octant: the nearest child first,
/// then its face neighbours, edge neighbours and finally the opposite one.
pub const CHILD_VISIT_ORDER: [usize; 8] = [0, 1, 2, 4, 3, 5, 6, 7];

/// Octant of a node nearest to the viewpoint.
pub fn nearest_octant(node_center: Vec3, eye: Vec3) -> usize {
    point_octant(node_center, eye)
}
