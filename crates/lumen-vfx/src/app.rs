mod camera;
mod context;
mod demo;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use winit::window::Window;

use lumen_vfx::gpu::TargetFormats;
use lumen_vfx::{EffectDef, EmitterId, SpawnMode, VfxManager};

use camera::OrbitCamera;
use context::{DEPTH_FORMAT, GpuContext};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.006,
    g: 0.002,
    b: 0.006,
    a: 1.0,
};

pub struct App {
    pub gpu: GpuContext,
    pub window: Arc<Window>,
    pub manager: VfxManager,
    pub camera: OrbitCamera,
    start_time: Instant,
    last_frame: Instant,
    burst_emitters: Vec<EmitterId>,
    next_burst: f32,
    rng: Pcg32,
}

impl App {
    pub fn new(window: Arc<Window>, effect_path: Option<&Path>) -> Result<Self> {
        let gpu = GpuContext::new(window.clone())?;

        let effect = match effect_path {
            Some(path) => EffectDef::load(path)?,
            None => demo::builtin_effect(),
        };
        let mut manager = VfxManager::new();
        let loaded = manager.load_effect(&effect)?;
        manager.attach_gpu(
            &gpu.device,
            &gpu.queue,
            TargetFormats {
                color: gpu.format,
                depth: Some(DEPTH_FORMAT),
            },
        )?;

        let burst_emitters = loaded
            .emitters
            .iter()
            .copied()
            .filter(|id| {
                manager
                    .emitter(*id)
                    .is_some_and(|e| e.settings().spawn_mode == SpawnMode::Burst)
            })
            .collect();

        let now = Instant::now();
        Ok(Self {
            gpu,
            window,
            manager,
            camera: OrbitCamera::default(),
            start_time: now,
            last_frame: now,
            burst_emitters,
            next_burst: 0.0,
            rng: Pcg32::from_entropy(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    pub fn update(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        let elapsed = now.duration_since(self.start_time).as_secs_f32();

        self.camera.advance(dt);
        if let Err(e) = self.manager.update(dt, elapsed) {
            log::error!("VFX update failed: {e}");
        }

        // Bursts go out after the update so they carry this frame's time.
        if elapsed >= self.next_burst {
            self.trigger_bursts();
            self.next_burst = elapsed + demo::BURST_INTERVAL;
        }
    }

    /// Fire every running burst emitter at a random spot around the origin.
    pub fn trigger_bursts(&mut self) {
        for id in &self.burst_emitters {
            let Some(emitter) = self.manager.emitter_mut(*id) else {
                continue;
            };
            if !emitter.is_emitting() {
                continue;
            }
            let origin = emitter.node().position;
            let offset = Vec3::new(
                self.rng.gen_range(-2.0..2.0),
                0.0,
                self.rng.gen_range(-2.0..2.0),
            );
            let target = Vec3::new(offset.x, origin.y, offset.z);
            if let Err(e) = emitter.emit_at(Some(target), true) {
                log::warn!("Burst failed: {e}");
            }
        }
    }

    pub fn toggle_emitting(&mut self) {
        for (_, emitter) in self.manager.emitters_mut() {
            if emitter.is_emitting() {
                emitter.stop_emitting();
            } else {
                emitter.start_emitting(false);
            }
        }
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.gpu.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let frame = self.camera.frame(self.gpu.aspect());
        match self.manager.prepare(&self.gpu.queue, &frame) {
            Ok(uploaded) if uploaded > 0 => log::trace!("{uploaded} pool(s) uploaded"),
            Ok(_) => {}
            Err(e) => log::error!("VFX prepare failed: {e}"),
        }

        let mut encoder =
            self.gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("lumen-encoder"),
                });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vfx-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.gpu.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.manager.draw(&mut pass);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    pub fn shutdown(&mut self) {
        if !self.manager.is_disposed() {
            self.manager.dispose();
        }
    }
}
