pub mod static_instancing;

pub use static_instancing::{InstanceBuffer, InstanceData, InstancingGroup, InstancingKey, StaticInstancingInfo};
