/// ContentDispatcher: per-object work for visible nodes.
///
/// For each node the traversal marked visible, the dispatcher walks the
/// object lists, re-tests every object against the node's pass mask and
/// emits a `RenderItem` for each survivor. Nodes are handled inline on the
/// calling thread or as one job per node on the worker pool; job results
/// come back over a bounded channel drained by the calling thread.

use std::sync::PoisonError;
use crossbeam_channel::RecvTimeoutError;
use crate::config::TreeConfig;
use crate::culling::{CullState, VisibilityCuller};
use crate::instancing::StaticInstancingInfo;
use crate::object::{InternalFlags, ObjectCategory, ObjectKey, ObjectSlot};
use crate::tree::{NodeKey, SpatialNode, SpatialTree};
use super::job_pool::JobPool;
use super::render_item::{LodSelection, RenderItem};

const SOURCE: &str = "galaxy3d::ContentDispatcher";

/// One visible node queued by the traversal
#[derive(Debug, Clone, Copy)]
pub struct NodeWork {
    pub node: NodeKey,
    pub state: CullState,
    /// Position of the node in traversal order
    pub order: u32,
}

impl NodeWork {
    /// Only shadow passes see the node: walk the caster list alone.
    pub fn casters_only(&self) -> bool {
        !self.state.mask.has_main()
    }
}

/// Items and counters gathered for a set of nodes
#[derive(Debug, Default)]
pub struct DispatchOutput {
    pub items: Vec<RenderItem>,
    pub objects_tested: usize,
    pub jobs_spawned: usize,
    pub wait_timeouts: usize,
}

struct JobResult {
    items: Vec<RenderItem>,
    tested: usize,
}

pub struct ContentDispatcher<'a> {
    tree: &'a SpatialTree,
    culler: &'a VisibilityCuller<'a>,
    config: &'a TreeConfig,
}

impl<'a> ContentDispatcher<'a> {
    pub fn new(tree: &'a SpatialTree, culler: &'a VisibilityCuller<'a>, config: &'a TreeConfig) -> Self {
        Self { tree, culler, config }
    }

    /// Dispatch every node on the calling thread.
    pub fn run_inline(&self, works: &[NodeWork]) -> DispatchOutput {
        let mut output = DispatchOutput::default();
        for work in works {
            let items = &mut output.items;
            output.objects_tested += self.dispatch_node(work, false, &mut |item| items.push(item));
        }
        output
    }

    /// Dispatch one job per node and drain the results on the calling thread.
    pub fn run_jobs(&self, works: &[NodeWork], pool: &JobPool) -> DispatchOutput {
        let (sender, receiver) = crossbeam_channel::bounded::<JobResult>(self.config.output_queue_capacity.max(1));
        let wait = self.config.output_queue_wait;

        pool.pool().in_place_scope(|scope| {
            let mut output = DispatchOutput::default();
            for work in works {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let mut items = Vec::new();
                    let tested = self.dispatch_node(work, true, &mut |item| items.push(item));
                    // Receiver outlives the scope
                    let _ = sender.send(JobResult { items, tested });
                });
                output.jobs_spawned += 1;
            }
            drop(sender);

            loop {
                match receiver.recv_timeout(wait) {
                    Ok(result) => {
                        output.objects_tested += result.tested;
                        output.items.extend(result.items);
                    }
                    Err(RecvTimeoutError::Timeout) => output.wait_timeouts += 1,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            if output.wait_timeouts > 0 {
                crate::engine_trace!(SOURCE, "Output queue wait timed out {} times", output.wait_timeouts);
            }
            output
        })
    }

    /// Emit items for one node. Returns the number of objects tested.
    ///
    /// With `on_worker`, objects that may render as jobs are prepared
    /// right away; the rest are left for the submitting thread.
    pub fn dispatch_node(&self, work: &NodeWork, on_worker: bool, emit: &mut dyn FnMut(RenderItem)) -> usize {
        let Some(node) = self.tree.node(work.node) else { return 0 };
        let _guard = node.content_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let instancing = node.instancing.read().unwrap_or_else(PoisonError::into_inner);

        let mut tested = 0;
        let mut order = 0u32;
        let mut visit = |key: ObjectKey, slot: &ObjectSlot| {
            // Members are drawn through their group owner
            if slot.internal.contains(InternalFlags::STATIC_INSTANCING) {
                return;
            }
            tested += 1;
            if let Some(item) = self.object_item(node, work, key, slot, instancing.as_ref(), order) {
                order += 1;
                let item = if on_worker && slot.object.can_render_as_job() {
                    slot.object.prepare_render(&item);
                    RenderItem { prepared: true, ..item }
                } else {
                    item
                };
                emit(item);
            }
        };

        if work.casters_only() {
            for &key in node.casters() {
                if let Some(slot) = self.tree.objects.get(key) {
                    visit(key, slot);
                }
            }
        } else {
            for category in ObjectCategory::ALL {
                for (key, slot) in node.list(category).iter(&self.tree.objects) {
                    visit(key, slot);
                }
            }
        }
        tested
    }

    fn object_item(
        &self,
        node: &SpatialNode,
        work: &NodeWork,
        key: ObjectKey,
        slot: &ObjectSlot,
        instancing: Option<&StaticInstancingInfo>,
        order: u32,
    ) -> Option<RenderItem> {
        let group = if slot.internal.contains(InternalFlags::INSTANCING_OWNER) {
            instancing.and_then(|info| info.group_for_owner(key))
        } else {
            None
        };
        let (bbox, instance_count) = match group {
            Some(group) => (*group.bbox(), group.len() as u32),
            None => (slot.bbox, 1),
        };

        let (mask, distance) = self.culler.object_cull_mask(
            &bbox,
            slot.max_view_distance,
            slot.render_flags,
            node.radius(),
            &work.state,
        );
        if mask.is_empty() {
            return None;
        }

        let lod = if slot.category == ObjectCategory::Vegetation {
            LodSelection::from_sprite_state(slot.sprite, self.config.sprite_transition_frames)
        } else {
            LodSelection::Model
        };

        Some(RenderItem {
            sort_key: RenderItem::make_sort_key(work.order, order),
            object: key,
            category: slot.category,
            mask,
            distance,
            lod,
            instance_count,
            prepared: false,
        })
    }
}
