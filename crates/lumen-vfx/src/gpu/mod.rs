pub mod alpha_mask;
pub mod geometry;
pub mod pool_gpu;
pub mod uniforms;

pub use alpha_mask::AlphaMask;
pub use geometry::{Geometry, GeometryVertex};
pub use pool_gpu::{PoolGpu, PoolResources, QueueUpload, TargetFormats};
pub use uniforms::{FrameUniforms, ParticleUniforms};
