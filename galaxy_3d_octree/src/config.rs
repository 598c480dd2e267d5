//! Tunables for the spatial tree.
//!
//! One `TreeConfig` is owned by each `SpatialTree`; the streaming controller
//! and the frame renderer read it from there.

use std::time::Duration;

/// Spatial tree configuration
#[derive(Debug, Clone)]
pub struct TreeConfig {
    // ===== FIT RULE =====
    /// Nodes whose full size is at or below this never subdivide
    pub node_min_size: f32,
    /// Object radius must stay below `node_radius * node_size_ratio` to descend
    pub node_size_ratio: f32,
    /// Object max view distance must stay below `node_radius * ratio` to descend
    pub view_dist_ratio_vegetation: f32,
    /// View distance ratio applied to streamed content aggregates
    pub view_dist_ratio: f32,

    // ===== CULLING =====
    /// Shadow bits are dropped beyond `max_view_distance * ratio`
    pub shadow_cast_view_dist_ratio: f32,
    /// Objects seeing less than this never enter a caster list
    pub min_shadow_caster_view_dist: f32,
    /// Node-level coverage test only for nodes with a larger radius
    pub coverage_node_min_radius: f32,
    /// Per-object occlusion test only inside nodes with a larger radius
    pub per_object_occlusion_min_node_size: f32,
    /// A node fully inside a dynamic cascade drops every coarser dynamic cascade
    pub skip_coarser_cascades: bool,

    // ===== DISPATCH =====
    /// Dispatch node content as jobs during general passes
    pub render_jobs: bool,
    /// Worker threads for content jobs (0 = rayon default)
    pub worker_threads: usize,
    /// Capacity of the job output queue
    pub output_queue_capacity: usize,
    /// Longest single wait of the main thread on the output queue
    pub output_queue_wait: Duration,

    // ===== INSTANCING =====
    /// Enable static instancing of vegetation groups
    pub static_instancing: bool,
    /// A group is promoted when its member count exceeds this
    pub static_instancing_min_instances: usize,

    // ===== SPRITES =====
    /// Enable vegetation sprite transitions
    pub sprites_enabled: bool,
    /// Hysteresis band as a fraction of the switch distance
    pub sprite_dissolve_dist_ratio: f32,
    /// Upper bound of the hysteresis band
    pub sprite_dissolve_min_dist: f32,
    /// Frames a cross-fade lasts
    pub sprite_transition_frames: u8,

    // ===== STREAMING =====
    /// Stream streamable object types instead of loading them up front
    pub stream_instances: bool,
    /// Maximum concurrent async reads
    pub stream_max_tasks: usize,
    /// Scale applied to the view distance bump of skipped streamable content
    pub stream_dist_ratio: f32,
    /// Extra distance used when prefetching around the camera
    pub stream_prediction_distance: f32,
    /// Nodes tested for eviction per frame = streamed / divisor + 1
    pub eviction_budget_divisor: usize,
    /// A node is evicted once it has not been touched for more rounds than this
    pub eviction_round_age: u32,

    // ===== MISC =====
    /// Editor behaviour: synchronous streaming, immediate empty-node release
    pub editor_mode: bool,
    /// Debug builds warn about object boxes larger than this
    pub huge_box_warning_size: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            node_min_size: 8.0,
            node_size_ratio: 1.0 / 16.0,
            view_dist_ratio_vegetation: 100.0,
            view_dist_ratio: 60.0,

            shadow_cast_view_dist_ratio: 0.8,
            min_shadow_caster_view_dist: 8.0,
            coverage_node_min_radius: 32.0,
            per_object_occlusion_min_node_size: 32.0,
            skip_coarser_cascades: true,

            render_jobs: true,
            worker_threads: 0,
            output_queue_capacity: 4096,
            output_queue_wait: Duration::from_millis(2),

            static_instancing: true,
            static_instancing_min_instances: 32,

            sprites_enabled: true,
            sprite_dissolve_dist_ratio: 0.1,
            sprite_dissolve_min_dist: 4.0,
            sprite_transition_frames: 8,

            stream_instances: true,
            stream_max_tasks: 8,
            stream_dist_ratio: 1.0,
            stream_prediction_distance: 16.0,
            eviction_budget_divisor: 30,
            eviction_round_age: 2,

            editor_mode: false,
            huge_box_warning_size: 1.0e6,
        }
    }
}
