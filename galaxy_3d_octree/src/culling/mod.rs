pub mod cull_mask;
pub mod render_pass;
pub mod occlusion;
pub mod visibility_culler;

pub use cull_mask::CullMask;
pub use render_pass::{CascadeKind, RenderPassInfo, ShadowCascade};
pub use occlusion::{NoOcclusion, OcclusionCuller};
pub use visibility_culler::{CullState, VisibilityCuller};
