use glam::{Mat4, Quat, Vec3};

/// Spatial node an emitter is attached to.
///
/// The host's scene hierarchy owns parenting; it publishes the resolved parent
/// matrix with [`SceneNode::set_parent_world`] and the emitter reads the
/// composed world transform once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneNode {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    parent_world: Mat4,
}

/// Position and orientation extracted from a world matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent_world: Mat4::IDENTITY,
        }
    }
}

impl SceneNode {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn set_parent_world(&mut self, parent: Mat4) {
        self.parent_world = parent;
    }

    pub fn parent_world(&self) -> Mat4 {
        self.parent_world
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.parent_world * self.local_matrix()
    }

    /// Decompose the world matrix; scale is discarded.
    pub fn world_pose(&self) -> WorldPose {
        let (_scale, orientation, position) = self.world_matrix().to_scale_rotation_translation();
        WorldPose {
            position,
            orientation,
        }
    }
}
