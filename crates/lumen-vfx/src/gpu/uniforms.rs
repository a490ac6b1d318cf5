use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::pool::settings::{RenderMode, ShadingParams};

/// Pool uniforms: 272 bytes.
/// Must be kept in sync with the WGSL `ParticleUniforms` struct.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ParticleUniforms {
    // Camera and pool transform (192 bytes)
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],

    // 16 bytes
    pub camera_position: [f32; 3],
    pub time: f32,

    // 16 bytes
    pub gravity: [f32; 3],
    pub intensity: f32,

    // 16 bytes
    pub fade_size: [f32; 2],
    pub fade_alpha: [f32; 2],

    // 16 bytes
    pub stretch_scale: f32,
    pub appearance: u32,
    pub easing: u32,
    pub render_mode: u32,

    // 16 bytes
    pub use_alpha_map: u32,
    pub _pad: [u32; 3],
}

/// Per-frame camera state supplied by the host renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
        }
    }
}

impl ParticleUniforms {
    /// Publish simulation time and the tunable shading parameters.
    pub fn refresh(&mut self, time: f32, shading: &ShadingParams, render_mode: RenderMode) {
        self.time = time;
        self.intensity = shading.intensity;
        self.stretch_scale = shading.stretch_scale;
        self.fade_size = shading.fade_size;
        self.fade_alpha = shading.fade_alpha;
        self.gravity = shading.gravity;
        self.appearance = shading.appearance.as_u32();
        self.easing = shading.easing.index();
        self.render_mode = render_mode.as_u32();
    }

    pub fn set_frame(&mut self, frame: &FrameUniforms) {
        self.view = frame.view.to_cols_array_2d();
        self.projection = frame.projection.to_cols_array_2d();
        self.camera_position = frame.camera_position.to_array();
    }

    pub fn set_model(&mut self, model: Mat4) {
        self.model = model.to_cols_array_2d();
    }
}
