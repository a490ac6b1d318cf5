use bytemuck::{Pod, Zeroable};

use crate::error::{Result, VfxError};

/// Base geometry vertex: position + uv (20 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GeometryVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl GeometryVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GeometryVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Indexed triangle list every instance is drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<GeometryVertex>,
    pub indices: Vec<u16>,
}

impl Geometry {
    /// Quad in the XY plane centred on the origin, facing +Z.
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        let vertices = vec![
            GeometryVertex {
                position: [-hw, hh, 0.0],
                uv: [0.0, 0.0],
            },
            GeometryVertex {
                position: [hw, hh, 0.0],
                uv: [1.0, 0.0],
            },
            GeometryVertex {
                position: [-hw, -hh, 0.0],
                uv: [0.0, 1.0],
            },
            GeometryVertex {
                position: [hw, -hh, 0.0],
                uv: [1.0, 1.0],
            },
        ];
        Self {
            vertices,
            indices: vec![0, 2, 1, 2, 3, 1],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.indices.is_empty() || self.indices.len() % 3 != 0 {
            return Err(VfxError::invalid(format!(
                "geometry needs a non-empty triangle list, got {} indices",
                self.indices.len()
            )));
        }
        let count = self.vertices.len();
        if let Some(bad) = self.indices.iter().find(|&&i| usize::from(i) >= count) {
            return Err(VfxError::invalid(format!(
                "geometry index {bad} is out of range for {count} vertices"
            )));
        }
        Ok(())
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::plane(0.5, 0.5)
    }
}
