/*!
# Galaxy 3D Octree

Hierarchical spatial index used by the Galaxy 3D renderer to store, cull and
dispatch scene content.

## Architecture

- **SpatialTree**: arena of 8-ary nodes, objects placed by a size and view
  distance fit rule, aggregated bounds and flags per subtree
- **VisibilityCuller**: one traversal tests the main view and every shadow
  cascade at once, carrying a pass mask from parent to child
- **ContentDispatcher**: per-object work for visible nodes, inline or as
  worker jobs feeding a bounded output queue
- **StreamingController**: loads and evicts per-node persisted content
  around the viewpoint under a per-frame budget
- **Static instancing**: homogeneous vegetation collapsed into instanced
  groups, rebuilt lazily when a node changes
- **FrameRenderer**: the per-pass driver tying the above together

Scene objects are owned by the host and seen through the `SceneObject`
capability trait.
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod math;
pub mod camera;
pub mod object;
pub mod tree;
pub mod culling;
pub mod dispatch;
pub mod instancing;
pub mod streaming;
pub mod serialize;
pub mod render;

#[cfg(test)]
mod test_support;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Tunables
    pub use crate::config::TreeConfig;

    // Tree and frame driver
    pub use crate::tree::{NodeKey, SpatialNode, SpatialTree};
    pub use crate::render::{FrameRenderer, FrameStats};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, set_logger, reset_logger};
    }

    pub mod math {
        pub use crate::math::*;
    }

    pub mod camera {
        pub use crate::camera::*;
    }

    pub mod object {
        pub use crate::object::*;
    }

    pub mod culling {
        pub use crate::culling::*;
    }

    pub mod dispatch {
        pub use crate::dispatch::*;
    }

    pub mod instancing {
        pub use crate::instancing::*;
    }

    pub mod streaming {
        pub use crate::streaming::*;
    }

    pub mod serialize {
        pub use crate::serialize::*;
    }
}

// Re-export math library at crate root
pub use glam;
