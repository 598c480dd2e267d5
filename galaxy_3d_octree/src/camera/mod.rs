pub mod camera;
pub mod frustum;

pub use camera::Camera;
pub use frustum::{Frustum, FrustumTest};
