pub mod render_item;
pub mod sprite;
pub mod render_sink;
pub mod job_pool;
pub mod content_dispatcher;

pub use render_item::{sort_render_items, LodSelection, RenderItem};
pub use sprite::{advance_sprite_state, hysteresis_band, SpriteState};
pub use render_sink::{CollectingSink, RenderSink};
pub use job_pool::JobPool;
pub use content_dispatcher::{ContentDispatcher, DispatchOutput, NodeWork};
