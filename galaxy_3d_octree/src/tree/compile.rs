//! Per-node compile pass: derived object flags, caster lists and upward
//! propagation of shadow casting and view distance.

use crate::object::object_list::ObjectSlots;
use crate::object::{InternalFlags, ObjectCategory, ObjectKey, ObjectType, RenderFlags};
use super::spatial_node::NodeKey;
use super::spatial_tree::SpatialTree;

fn derived_flags(objects: &ObjectSlots, key: ObjectKey) -> InternalFlags {
    let Some(slot) = objects.get(key) else { return InternalFlags::empty() };
    match slot.object_type {
        ObjectType::Light
        | ObjectType::Cloud
        | ObjectType::FogVolume
        | ObjectType::Decal
        | ObjectType::Road => InternalFlags::empty(),
        ObjectType::ParticleEmitter => {
            InternalFlags::REQUIRES_FORWARD_RENDERING | InternalFlags::REQUIRES_NEAREST_CUBEMAP
        }
        _ => {
            let forward = slot.object.material_requires_forward()
                || slot.render_flags.contains(RenderFlags::ALPHA_BLENDED);
            let mut flags = InternalFlags::empty();
            if forward {
                flags |= InternalFlags::REQUIRES_FORWARD_RENDERING;
            }
            if forward || slot.object.material_requires_nearest_cubemap() {
                flags |= InternalFlags::REQUIRES_NEAREST_CUBEMAP;
            }
            flags
        }
    }
}

impl SpatialTree {
    /// Compile every dirty category of a node.
    ///
    /// Returns `false` when the node was already compiled.
    pub fn compile_node(&mut self, node_key: NodeKey) -> bool {
        let Some(node) = self.nodes.get(node_key) else { return false };
        let dirty: Vec<ObjectCategory> = ObjectCategory::ALL
            .iter()
            .copied()
            .filter(|&c| !node.compiled[c.index()])
            .collect();
        if dirty.is_empty() {
            return false;
        }

        for &category in &dirty {
            for key in node.lists[category.index()].keys(&self.objects) {
                let derived = derived_flags(&self.objects, key);
                if let Some(slot) = self.objects.get_mut(key) {
                    slot.max_view_distance = slot.object.max_view_distance();
                    slot.render_flags = slot.object.render_flags();
                    slot.internal.remove(
                        InternalFlags::REQUIRES_FORWARD_RENDERING | InternalFlags::REQUIRES_NEAREST_CUBEMAP,
                    );
                    slot.internal |= derived;
                }
            }
        }

        // Casters: every non-light object that casts, sees far enough and
        // is drawn on its own
        let min_view = self.config.min_shadow_caster_view_dist;
        let mut casters = Vec::new();
        let mut max_view = 0.0f32;
        for category in ObjectCategory::ALL {
            for (key, slot) in node.lists[category.index()].iter(&self.objects) {
                max_view = max_view.max(slot.max_view_distance);
                if category == ObjectCategory::Light {
                    continue;
                }
                if slot.render_flags.contains(RenderFlags::CAST_SHADOW_MAPS)
                    && !slot.render_flags.contains(RenderFlags::HIDDEN)
                    && !slot.internal.contains(InternalFlags::STATIC_INSTANCING)
                    && slot.max_view_distance > min_view
                {
                    casters.push(key);
                }
            }
        }

        let has_casters = !casters.is_empty();
        if let Some(node) = self.nodes.get_mut(node_key) {
            node.casters = casters;
            node.compiled = [true; crate::object::CATEGORY_COUNT];
        }

        let mut cursor = Some(node_key);
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get_mut(current) else { break };
            if has_casters {
                node.render_flags |= RenderFlags::CAST_SHADOW_MAPS | RenderFlags::HAS_CAST_SHADOW_MAPS;
            }
            node.max_view_distance = node.max_view_distance.max(max_view);
            cursor = node.parent;
        }
        true
    }
}
