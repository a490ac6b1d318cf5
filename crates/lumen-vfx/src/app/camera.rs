use glam::{Mat4, Vec3};
use lumen_vfx::gpu::FrameUniforms;

/// Camera slowly circling a target point.
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub height: f32,
    pub yaw: f32,
    /// Radians per second.
    pub orbit_speed: f32,
    pub fov_y: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 1.0, 0.0),
            distance: 8.0,
            height: 1.5,
            yaw: 0.0,
            orbit_speed: 0.15,
            fov_y: 75f32.to_radians(),
        }
    }
}

impl OrbitCamera {
    pub fn advance(&mut self, dt: f32) {
        self.yaw = (self.yaw + self.orbit_speed * dt) % std::f32::consts::TAU;
    }

    pub fn eye(&self) -> Vec3 {
        let (sin, cos) = self.yaw.sin_cos();
        self.target + Vec3::new(sin * self.distance, self.height, cos * self.distance)
    }

    pub fn frame(&self, aspect: f32) -> FrameUniforms {
        let eye = self.eye();
        FrameUniforms {
            view: Mat4::look_at_rh(eye, self.target, Vec3::Y),
            projection: Mat4::perspective_rh(self.fov_y, aspect.max(1e-3), 0.1, 1000.0),
            camera_position: eye,
        }
    }
}
