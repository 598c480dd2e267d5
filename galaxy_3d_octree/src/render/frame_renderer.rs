/// FrameRenderer: one render pass over the spatial tree.
///
/// Phase one walks the tree on the calling thread, nearest octant first.
/// Each visible node is touched for streaming, has its instancing groups
/// and compiled lists refreshed, its vegetation sprites advanced, and is
/// queued with its pass mask. Phase two hands the queue to the
/// `ContentDispatcher` (inline, or one job per node), puts the items back
/// in traversal order and submits them to the sink.

use glam::Vec3;
use crate::config::TreeConfig;
use crate::culling::{CullState, OcclusionCuller, RenderPassInfo, VisibilityCuller};
use crate::dispatch::{sort_render_items, ContentDispatcher, JobPool, NodeWork, RenderSink};
use crate::error::Result;
use crate::streaming::StreamingController;
use crate::tree::{nearest_octant, NodeKey, SpatialTree, CHILD_VISIT_ORDER};

const SOURCE: &str = "galaxy3d::FrameRenderer";

/// Counters of one `render` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub nodes_visited: usize,
    /// Visited nodes that no pass could see
    pub nodes_culled: usize,
    pub nodes_reaped: usize,
    pub objects_tested: usize,
    pub objects_emitted: usize,
    pub jobs_spawned: usize,
    pub wait_timeouts: usize,
}

#[derive(Default)]
pub struct FrameRenderer {
    pool: Option<JobPool>,
}

impl FrameRenderer {
    /// Renderer that dispatches every node on the calling thread.
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Renderer backed by a worker pool sized from `config.worker_threads`.
    pub fn with_jobs(config: &TreeConfig) -> Result<Self> {
        let pool = JobPool::new(config.worker_threads)?;
        Ok(Self { pool: Some(pool) })
    }

    pub fn has_jobs(&self) -> bool {
        self.pool.is_some()
    }

    /// Worker threads of the content pool, 0 when dispatch runs inline.
    pub fn job_threads(&self) -> usize {
        self.pool.as_ref().map_or(0, JobPool::thread_count)
    }

    /// Cull, dispatch and submit one pass.
    ///
    /// Empty nodes queued since the last frame are reaped first, in one
    /// batch.
    pub fn render(
        &self,
        tree: &mut SpatialTree,
        pass: &RenderPassInfo,
        occlusion: &dyn OcclusionCuller,
        streaming: Option<&mut StreamingController>,
        sink: &mut dyn RenderSink,
    ) -> FrameStats {
        let mut stats = FrameStats {
            nodes_reaped: tree.release_empty_nodes(),
            ..FrameStats::default()
        };

        // Phase one mutates the tree; the culler reads its own copy of the tunables
        let config = tree.config().clone();
        let culler = VisibilityCuller::new(pass, occlusion, &config);
        let mut traversal = Traversal {
            culler: &culler,
            config: &config,
            eye: pass.camera().position(),
            traversal_id: tree.next_traversal_id(),
            streaming,
            works: Vec::new(),
            stats: &mut stats,
        };
        let root = tree.root();
        traversal.visit(tree, root, CullState::new(pass.full_mask()));
        let works = traversal.works;

        let dispatcher = ContentDispatcher::new(tree, &culler, &config);
        let output = match &self.pool {
            Some(pool) if pass.is_general_pass() && config.render_jobs => dispatcher.run_jobs(&works, pool),
            _ => dispatcher.run_inline(&works),
        };
        stats.objects_tested = output.objects_tested;
        stats.jobs_spawned = output.jobs_spawned;
        stats.wait_timeouts = output.wait_timeouts;

        let mut items = output.items;
        sort_render_items(&mut items);
        for item in &items {
            let Some(slot) = tree.object(item.object) else { continue };
            if !item.prepared {
                slot.object().prepare_render(item);
            }
            sink.submit(item, slot.object().as_ref());
        }
        stats.objects_emitted = items.len();

        crate::engine_trace!(
            SOURCE,
            "Frame {}: {} nodes visited, {} queued, {} items",
            pass.frame_id(),
            stats.nodes_visited,
            works.len(),
            stats.objects_emitted
        );
        stats
    }
}

struct Traversal<'a, 's> {
    culler: &'a VisibilityCuller<'a>,
    config: &'a TreeConfig,
    eye: Vec3,
    traversal_id: u32,
    streaming: Option<&'s mut StreamingController>,
    works: Vec<NodeWork>,
    stats: &'a mut FrameStats,
}

impl Traversal<'_, '_> {
    fn visit(&mut self, tree: &mut SpatialTree, node_key: NodeKey, input: CullState) {
        let Some(node) = tree.node(node_key) else { return };
        if node.one_pass_mark() == self.traversal_id {
            return;
        }
        self.stats.nodes_visited += 1;

        let state = self.culler.update_cull_mask(node, input);
        if !state.is_visible() {
            self.stats.nodes_culled += 1;
            return;
        }
        let children = node.children;
        let center = node.center();
        if let Some(node) = tree.node_mut(node_key) {
            node.one_pass_mark = self.traversal_id;
        }

        if let Some(streaming) = self.streaming.as_deref_mut() {
            streaming.check_start_streaming(tree, node_key, self.config.editor_mode);
        }
        // Grouping first so the compiled caster list skips group members
        tree.check_update_static_instancing(node_key);
        tree.compile_node(node_key);
        if state.mask.has_main() {
            let pass = self.culler.pass();
            tree.update_node_sprites(node_key, self.eye, pass.zoom(), pass.frame_id());
        }

        if tree.node(node_key).is_some_and(|n| n.has_objects()) {
            let order = self.works.len() as u32;
            self.works.push(NodeWork { node: node_key, state, order });
        }

        let nearest = nearest_octant(center, self.eye);
        for offset in CHILD_VISIT_ORDER {
            if let Some(child) = children[nearest ^ offset] {
                self.visit(tree, child, state);
            }
        }
    }
}

#[cfg(test)]
#[path = "frame_renderer_tests.rs"]
mod tests;
