use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, BufferBindingType, ColorTargetState,
    Device, FragmentState, PipelineCompilationOptions, PipelineLayoutDescriptor, PrimitiveState,
    Queue, RenderPipeline, ShaderStages, TextureFormat, VertexState,
};

use super::alpha_mask::AlphaMask;
use super::geometry::{Geometry, GeometryVertex};
use super::uniforms::ParticleUniforms;
use crate::pool::instances::{InstanceAttribute, InstanceSink};
use crate::pool::settings::BlendMode;

const PARTICLE_SHADER: &str = include_str!("shaders/particle.wgsl");

/// Attachment formats of the pass the pool is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormats {
    pub color: TextureFormat,
    /// Depth is tested but never written.
    pub depth: Option<TextureFormat>,
}

/// Optional resources a pool is created with.
#[derive(Default)]
pub struct PoolResources {
    pub alpha_mask: Option<AlphaMask>,
    /// Defaults to a 0.5 x 0.5 plane.
    pub geometry: Option<Geometry>,
}

/// GPU side of a particle pool: one vertex buffer per instance attribute,
/// the base geometry, the uniform buffer and the render pipeline.
pub struct PoolGpu {
    capacity: u32,
    instance_buffers: [wgpu::Buffer; 7],
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: BindGroup,
    pipeline: RenderPipeline,
    alpha_mask: AlphaMask,
    has_alpha_mask: bool,
}

impl PoolGpu {
    pub fn new(
        device: &Device,
        queue: &Queue,
        capacity: u32,
        blend_mode: BlendMode,
        targets: TargetFormats,
        resources: PoolResources,
    ) -> crate::Result<Self> {
        let geometry = resources.geometry.unwrap_or_default();
        geometry.validate()?;

        let instance_buffers = InstanceAttribute::ALL.map(|attr| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(attr.label()),
                size: attr.stride_bytes() * u64::from(capacity),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle-geometry-vertices"),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        // Index buffer contents must be 4-byte aligned.
        let mut indices = geometry.indices.clone();
        if indices.len() % 2 == 1 {
            indices.push(0);
        }
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle-geometry-indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particle-uniforms"),
            size: std::mem::size_of::<ParticleUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let has_alpha_mask = resources.alpha_mask.is_some();
        let alpha_mask = resources
            .alpha_mask
            .unwrap_or_else(|| AlphaMask::placeholder(device, queue));

        let bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("particle-bgl"),
            entries: &[
                // binding 0: uniforms
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // binding 1: alpha mask
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // binding 2: alpha mask sampler
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("particle-bg"),
            layout: &bgl,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::TextureView(&alpha_mask.view),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: BindingResource::Sampler(&alpha_mask.sampler),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("particle-shader"),
            source: wgpu::ShaderSource::Wgsl(PARTICLE_SHADER.into()),
        });

        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("particle-pipeline-layout"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });

        let layouts = vertex_layouts();
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("particle-pipeline"),
            layout: Some(&layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &layouts,
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: targets.color,
                    blend: blend_state(blend_mode),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: targets.depth.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        log::debug!(
            "Created particle pipeline: {} instances, {} indices, blend {:?}",
            capacity,
            geometry.indices.len(),
            blend_mode
        );

        Ok(Self {
            capacity,
            instance_buffers,
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
            uniform_buffer,
            bind_group,
            pipeline,
            alpha_mask,
            has_alpha_mask,
        })
    }

    pub fn has_alpha_mask(&self) -> bool {
        self.has_alpha_mask
    }

    pub fn write_uniforms(&self, queue: &Queue, uniforms: &ParticleUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Sink that turns dirty instance spans into queue writes.
    pub fn upload<'a>(&'a self, queue: &'a Queue) -> QueueUpload<'a> {
        QueueUpload {
            queue,
            buffers: &self.instance_buffers,
        }
    }

    /// Record the single instanced draw call for every slot of the pool.
    /// Slots that are expired or were never written collapse in the vertex stage.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        for (i, buffer) in self.instance_buffers.iter().enumerate() {
            pass.set_vertex_buffer(i as u32 + 1, buffer.slice(..));
        }
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..self.capacity);
    }

    /// Release every buffer. Consumes the GPU state so it runs at most once.
    pub fn destroy(self) {
        for buffer in &self.instance_buffers {
            buffer.destroy();
        }
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.uniform_buffer.destroy();
        self.alpha_mask.texture.destroy();
    }
}

/// [`InstanceSink`] writing straight into the pool's vertex buffers.
pub struct QueueUpload<'a> {
    queue: &'a Queue,
    buffers: &'a [wgpu::Buffer; 7],
}

impl InstanceSink for QueueUpload<'_> {
    fn write_attribute(&mut self, attribute: InstanceAttribute, byte_offset: u64, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.queue
            .write_buffer(&self.buffers[attribute as usize], byte_offset, data);
    }
}

const MATRIX_ATTRIBS: [wgpu::VertexAttribute; 4] =
    wgpu::vertex_attr_array![2 => Float32x4, 3 => Float32x4, 4 => Float32x4, 5 => Float32x4];
const COLOR_START_ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![6 => Float32x3];
const COLOR_END_ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![7 => Float32x3];
const DIRECTION_ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![8 => Float32x3];
const LIFETIME_ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![9 => Float32x2];
const SPEED_ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![10 => Float32x2];
const ROTATION_SPEED_ATTRIBS: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![11 => Float32x3];

/// Slot 0 is the base geometry, slots 1..=7 follow `InstanceAttribute::ALL`.
fn vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 8] {
    let instance = |attr: InstanceAttribute, attributes: &'static [wgpu::VertexAttribute]| {
        wgpu::VertexBufferLayout {
            array_stride: attr.stride_bytes(),
            step_mode: wgpu::VertexStepMode::Instance,
            attributes,
        }
    };
    [
        GeometryVertex::desc(),
        instance(InstanceAttribute::Matrix, &MATRIX_ATTRIBS),
        instance(InstanceAttribute::ColorStart, &COLOR_START_ATTRIBS),
        instance(InstanceAttribute::ColorEnd, &COLOR_END_ATTRIBS),
        instance(InstanceAttribute::Direction, &DIRECTION_ATTRIBS),
        instance(InstanceAttribute::Lifetime, &LIFETIME_ATTRIBS),
        instance(InstanceAttribute::Speed, &SPEED_ATTRIBS),
        instance(InstanceAttribute::RotationSpeed, &ROTATION_SPEED_ATTRIBS),
    ]
}

pub fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    use wgpu::{BlendComponent, BlendFactor, BlendOperation};

    let component = |src_factor, dst_factor| BlendComponent {
        src_factor,
        dst_factor,
        operation: BlendOperation::Add,
    };
    match mode {
        BlendMode::None => None,
        BlendMode::Normal => Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::Additive => Some(wgpu::BlendState {
            color: component(BlendFactor::SrcAlpha, BlendFactor::One),
            alpha: component(BlendFactor::One, BlendFactor::One),
        }),
        BlendMode::Subtractive => Some(wgpu::BlendState {
            color: component(BlendFactor::Zero, BlendFactor::OneMinusSrc),
            alpha: component(BlendFactor::Zero, BlendFactor::One),
        }),
        BlendMode::Multiply => Some(wgpu::BlendState {
            color: component(BlendFactor::Zero, BlendFactor::Src),
            alpha: component(BlendFactor::Zero, BlendFactor::SrcAlpha),
        }),
    }
}
