/// InstancingOptimizer: per-node static instancing of vegetation.
///
/// Vegetation objects of one node sharing a mesh and a material are drawn
/// through one instance buffer once the group grows past
/// `static_instancing_min_instances`. The first member owns the buffer;
/// the others are flagged `STATIC_INSTANCING` and skipped by the
/// dispatcher. Any change to the node's vegetation marks it dirty and the
/// groups are rebuilt from scratch the next time the node is touched.

use std::sync::atomic::Ordering;
use std::sync::PoisonError;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use rustc_hash::FxHashMap;
use crate::math::AABB;
use crate::object::{InternalFlags, MaterialId, MeshId, ObjectCategory, ObjectKey, RenderFlags};
use crate::tree::{NodeKey, SpatialTree};

const SOURCE: &str = "galaxy3d::Instancing";

/// Grouping key
pub type InstancingKey = (MeshId, MaterialId);

/// Per-instance GPU data (64 bytes, column-major)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    pub transform: [[f32; 4]; 4],
}

impl InstanceData {
    pub fn from_matrix(matrix: &Mat4) -> Self {
        Self { transform: matrix.to_cols_array_2d() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstanceBuffer {
    instances: Vec<InstanceData>,
}

impl InstanceBuffer {
    pub fn push(&mut self, instance: InstanceData) {
        self.instances.push(instance);
    }

    pub fn instances(&self) -> &[InstanceData] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Raw bytes ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

#[derive(Debug, Clone)]
pub struct InstancingGroup {
    owner: ObjectKey,
    /// Every member, owner first
    members: Vec<ObjectKey>,
    bbox: AABB,
    buffer: InstanceBuffer,
}

impl InstancingGroup {
    pub fn owner(&self) -> ObjectKey {
        self.owner
    }

    pub fn members(&self) -> &[ObjectKey] {
        &self.members
    }

    /// Union of the member boxes
    pub fn bbox(&self) -> &AABB {
        &self.bbox
    }

    pub fn buffer(&self) -> &InstanceBuffer {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Promoted groups of one node
#[derive(Debug, Clone, Default)]
pub struct StaticInstancingInfo {
    groups: FxHashMap<InstancingKey, InstancingGroup>,
}

impl StaticInstancingInfo {
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, key: &InstancingKey) -> Option<&InstancingGroup> {
        self.groups.get(key)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&InstancingKey, &InstancingGroup)> {
        self.groups.iter()
    }

    pub fn group_for_owner(&self, owner: ObjectKey) -> Option<&InstancingGroup> {
        self.groups.values().find(|group| group.owner == owner)
    }

    pub fn instance_count(&self) -> usize {
        self.groups.values().map(InstancingGroup::len).sum()
    }
}

impl SpatialTree {
    /// Rebuild a node's instancing groups if its vegetation changed.
    ///
    /// Returns `true` when a rebuild happened.
    pub fn check_update_static_instancing(&mut self, node_key: NodeKey) -> bool {
        let Some(node) = self.nodes.get(node_key) else { return false };
        if !node.is_instancing_dirty() {
            return false;
        }
        let vegetation = ObjectCategory::Vegetation.index();
        let list = node.lists[vegetation];

        // Drop whatever was applied before
        for key in list.keys(&self.objects) {
            if let Some(slot) = self.objects.get_mut(key) {
                slot.internal.remove(InternalFlags::STATIC_INSTANCING | InternalFlags::INSTANCING_OWNER);
            }
        }

        let mut info = StaticInstancingInfo::default();
        if self.config.static_instancing {
            let mut candidates: FxHashMap<InstancingKey, Vec<ObjectKey>> = FxHashMap::default();
            for (key, slot) in list.iter(&self.objects) {
                if slot.render_flags.contains(RenderFlags::HIDDEN) {
                    continue;
                }
                let (Some(mesh), Some(material)) = (slot.object.mesh_id(), slot.object.material_id()) else {
                    continue;
                };
                candidates.entry((mesh, material)).or_default().push(key);
            }

            let min_instances = self.config.static_instancing_min_instances;
            for (group_key, members) in candidates {
                if members.len() <= min_instances {
                    continue;
                }
                let mut bbox = AABB::RESET;
                let mut buffer = InstanceBuffer::default();
                for slot in members.iter().filter_map(|&key| self.objects.get(key)) {
                    bbox.add_box(&slot.bbox);
                    buffer.push(InstanceData::from_matrix(&slot.object.world_transform()));
                }
                info.groups.insert(group_key, InstancingGroup { owner: members[0], members, bbox, buffer });
            }
        }

        let Some(node) = self.nodes.get_mut(node_key) else { return false };
        for group in info.groups.values() {
            if let Some(slot) = self.objects.get_mut(group.owner) {
                slot.internal |= InternalFlags::INSTANCING_OWNER;
            }
            for &member in &group.members[1..] {
                if let Some(slot) = self.objects.get_mut(member) {
                    slot.internal |= InternalFlags::STATIC_INSTANCING;
                }
                // Owners stay ahead of their members
                node.lists[vegetation].move_to_back(&mut self.objects, member);
            }
            crate::engine_debug!(
                SOURCE,
                "Node {:?}: instancing group of {} promoted",
                node_key,
                group.len()
            );
        }

        // Caster list depends on the member flags
        node.compiled[vegetation] = false;
        let promoted = if info.groups.is_empty() { None } else { Some(info) };
        *node.instancing.write().unwrap_or_else(PoisonError::into_inner) = promoted;
        node.instancing_dirty.store(false, Ordering::Release);
        true
    }
}

#[cfg(test)]
#[path = "static_instancing_tests.rs"]
mod tests;
