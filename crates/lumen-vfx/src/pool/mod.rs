//! Fixed-capacity particle pool backed by a ring buffer of instance attributes.
//!
//! Emission writes at a single advancing cursor and overwrites the oldest
//! slot once the ring is full; nothing is ever freed or compacted. Whether a
//! slot is alive is decided by the shader from its lifetime and the pool
//! time, so the CPU never revisits a particle after writing it.

pub mod instances;
pub mod ring;
pub mod settings;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use glam::Mat4;

use crate::error::{Result, VfxError};
use crate::gpu::{FrameUniforms, ParticleUniforms, PoolGpu, PoolResources, TargetFormats};
pub use instances::{InstanceAttribute, InstanceData, InstanceSink, Lifetime, ParticleRecord};
pub use ring::{DirtyRanges, RingCursor};
pub use settings::{AppearanceMode, BlendMode, PoolSettings, RenderMode, ShadingParams};

/// Shared pool reference. Several emitters may feed one pool; the manager
/// owns one handle per registered pool name.
pub type PoolHandle = Rc<RefCell<ParticlePool>>;

pub struct ParticlePool {
    settings: PoolSettings,
    instances: InstanceData,
    ring: RingCursor,
    uniforms: ParticleUniforms,
    model: Mat4,
    gpu: Option<PoolGpu>,
    disposed: bool,
}

impl fmt::Debug for ParticlePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParticlePool")
            .field("capacity", &self.ring.capacity())
            .field("cursor", &self.ring.cursor())
            .field("last_cursor", &self.ring.last_cursor())
            .field("render_mode", &self.settings.render_mode)
            .field("has_gpu", &self.gpu.is_some())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl ParticlePool {
    /// Validate `settings` and allocate CPU-side storage for every slot.
    pub fn new(settings: PoolSettings) -> Result<Self> {
        settings.validate()?;
        let capacity = settings.capacity as usize;

        let mut uniforms: ParticleUniforms = bytemuck::Zeroable::zeroed();
        uniforms.refresh(0.0, &settings.shading, settings.render_mode);
        uniforms.set_model(Mat4::IDENTITY);
        uniforms.set_frame(&FrameUniforms::default());

        log::info!(
            "Particle pool created: {} slots, {:?} mode",
            capacity,
            settings.render_mode
        );

        Ok(Self {
            instances: InstanceData::new(capacity),
            ring: RingCursor::new(capacity),
            uniforms,
            model: Mat4::IDENTITY,
            gpu: None,
            disposed: false,
            settings,
        })
    }

    /// Create the GPU buffers and pipeline for this pool. Everything already
    /// emitted is uploaded on the next `prepare`.
    pub fn attach_gpu(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        targets: TargetFormats,
        resources: PoolResources,
    ) -> Result<()> {
        if self.disposed {
            return Err(VfxError::precondition(
                "attach_gpu called on a disposed particle pool",
            ));
        }
        let gpu = PoolGpu::new(
            device,
            queue,
            self.settings.capacity,
            self.settings.blend_mode,
            targets,
            resources,
        )?;
        self.uniforms.use_alpha_map = u32::from(gpu.has_alpha_mask());
        if let Some(old) = self.gpu.replace(gpu) {
            old.destroy();
        }
        self.ring.mark_all_dirty();
        Ok(())
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Shading parameters are re-published on every [`ParticlePool::update`].
    pub fn shading_mut(&mut self) -> &mut ShadingParams {
        &mut self.settings.shading
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn cursor(&self) -> usize {
        self.ring.cursor()
    }

    pub fn last_cursor(&self) -> usize {
        self.ring.last_cursor()
    }

    pub fn needs_update(&self) -> bool {
        self.ring.needs_update()
    }

    pub fn instances(&self) -> &InstanceData {
        &self.instances
    }

    pub fn uniforms(&self) -> &ParticleUniforms {
        &self.uniforms
    }

    /// Host-facing flag. [`ParticlePool::draw`] never culls; a host renderer
    /// that tracks bounds may skip drawing pools that set it.
    pub fn frustum_culled(&self) -> bool {
        self.settings.frustum_culled
    }

    pub fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Pool transform applied in mesh mode.
    pub fn set_model_matrix(&mut self, model: Mat4) {
        self.model = model;
        self.uniforms.set_model(model);
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    /// Write `count` new particles at the cursor. `generate` runs exactly
    /// `count` times, in order. When `count` exceeds the free space the ring
    /// wraps and the oldest particles are overwritten, still alive or not.
    pub fn emit<F>(&mut self, count: usize, mut generate: F) -> Result<()>
    where
        F: FnMut() -> ParticleRecord,
    {
        if self.disposed {
            return Err(VfxError::precondition(
                "emit called on a disposed particle pool",
            ));
        }
        if count > self.capacity() {
            log::warn!(
                "Emitting {} particles into a pool of {}; the batch overwrites itself",
                count,
                self.capacity()
            );
        }

        let billboard = self.settings.render_mode.is_billboard();
        for _ in 0..count {
            let record = generate();
            let slot = self.ring.advance();
            self.instances.write(slot, &record, billboard);
        }
        Ok(())
    }

    /// Publish the simulation time and current shading parameters. Particle
    /// attributes are not touched.
    pub fn update(&mut self, current_time: f32) {
        self.uniforms
            .refresh(current_time, &self.settings.shading, self.settings.render_mode);
    }

    /// Upload what changed since the last flush into `sink`. Returns `false`
    /// (and writes nothing) when no particle was emitted in between.
    pub fn flush_into<S: InstanceSink + ?Sized>(&mut self, sink: &mut S) -> bool {
        let Some(ranges) = self.ring.take_dirty() else {
            return false;
        };
        log::debug!(
            "Flushing {} slots in {} range(s)",
            ranges.slot_count(),
            ranges.as_slice().len()
        );
        self.instances.upload(ranges.iter(), sink);
        true
    }

    /// Per-frame flush against the attached GPU state: uniforms are written
    /// every call, instance data only when dirty. Call once per drawn frame,
    /// before [`ParticlePool::draw`].
    pub fn prepare(&mut self, queue: &wgpu::Queue, frame: &FrameUniforms) -> bool {
        if self.disposed {
            log::error!("prepare called on a disposed particle pool");
            return false;
        }
        let Some(gpu) = self.gpu.as_ref() else {
            return false;
        };
        self.uniforms.set_frame(frame);
        gpu.write_uniforms(queue, &self.uniforms);

        let Some(ranges) = self.ring.take_dirty() else {
            return false;
        };
        self.instances.upload(ranges.iter(), &mut gpu.upload(queue));
        true
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if let Some(gpu) = &self.gpu {
            gpu.draw(pass);
        }
    }

    /// Release the GPU buffers. Idempotent; any later `emit` is rejected.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(gpu) = self.gpu.take() {
            gpu.destroy();
        }
        self.disposed = true;
        log::info!("Particle pool disposed ({} slots)", self.capacity());
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Range;

    use glam::Vec3;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<(InstanceAttribute, u64, usize)>,
    }

    impl Recorder {
        /// Slot ranges written to the lifetime stream.
        fn lifetime_slots(&self) -> Vec<Range<usize>> {
            let stride = InstanceAttribute::Lifetime.stride_bytes();
            self.writes
                .iter()
                .filter(|(attr, _, _)| *attr == InstanceAttribute::Lifetime)
                .map(|&(_, offset, len)| {
                    let start = (offset / stride) as usize;
                    start..start + len / stride as usize
                })
                .collect()
        }
    }

    impl InstanceSink for Recorder {
        fn write_attribute(&mut self, attribute: InstanceAttribute, offset: u64, data: &[u8]) {
            self.writes.push((attribute, offset, data.len()));
        }
    }

    fn pool(capacity: u32) -> ParticlePool {
        ParticlePool::new(PoolSettings::with_capacity(capacity)).unwrap()
    }

    fn tagged(start: f32) -> ParticleRecord {
        ParticleRecord {
            lifetime: Lifetime {
                start,
                duration: 1.0,
            },
            ..Default::default()
        }
    }

    fn lifetime_start(pool: &ParticlePool, slot: usize) -> f32 {
        pool.instances().slot(InstanceAttribute::Lifetime, slot)[0]
    }

    #[test]
    fn zero_capacity_fails_fast() {
        let err = ParticlePool::new(PoolSettings::with_capacity(0)).err().unwrap();
        assert!(matches!(err, VfxError::InvalidConfig(_)));
    }

    #[test]
    fn generator_runs_exactly_count_times() {
        let mut p = pool(8);
        let mut calls = 0;
        p.emit(5, || {
            calls += 1;
            tagged(1.0)
        })
        .unwrap();
        assert_eq!(calls, 5);
        assert_eq!(p.cursor(), 5);
        assert!(p.needs_update());
    }

    #[test]
    fn cursor_is_sum_of_counts_and_rest_untouched() {
        let mut p = pool(10);
        let mut n = 0.0;
        for k in [2, 3, 4] {
            p.emit(k, || {
                n += 1.0;
                tagged(n)
            })
            .unwrap();
        }
        assert_eq!(p.cursor(), 9);
        for slot in 0..9 {
            assert_eq!(lifetime_start(&p, slot), slot as f32 + 1.0);
        }
        assert_eq!(lifetime_start(&p, 9), 0.0);
    }

    #[test]
    fn wraparound_overwrites_oldest_first() {
        let mut p = pool(4);
        let mut n = 0.0;
        p.emit(6, || {
            n += 1.0;
            tagged(n)
        })
        .unwrap();
        assert_eq!(p.cursor(), 2);
        // slots 0 and 1 now hold the 5th and 6th particles
        assert_eq!(lifetime_start(&p, 0), 5.0);
        assert_eq!(lifetime_start(&p, 1), 6.0);
        assert_eq!(lifetime_start(&p, 2), 3.0);
    }

    #[test]
    fn flush_uploads_contiguous_range() {
        let mut p = pool(10);
        p.emit(3, || tagged(0.0)).unwrap();
        p.flush_into(&mut Recorder::default());

        let mut sink = Recorder::default();
        p.emit(4, || tagged(0.0)).unwrap();
        assert!(p.flush_into(&mut sink));
        assert_eq!(sink.lifetime_slots(), vec![3..7]);
        assert_eq!(sink.writes.len(), InstanceAttribute::ALL.len());
        assert_eq!(p.last_cursor(), 7);
    }

    #[test]
    fn flush_after_wrap_uploads_head_and_tail() {
        let mut p = pool(10);
        p.emit(7, || tagged(0.0)).unwrap();
        p.flush_into(&mut Recorder::default());

        let mut sink = Recorder::default();
        p.emit(5, || tagged(0.0)).unwrap();
        assert!(p.flush_into(&mut sink));
        assert_eq!(sink.lifetime_slots(), vec![0..2, 7..10]);
    }

    #[test]
    fn second_flush_without_emit_is_noop() {
        let mut p = pool(10);
        p.emit(2, || tagged(0.0)).unwrap();

        let mut first = Recorder::default();
        let mut second = Recorder::default();
        assert!(p.flush_into(&mut first));
        assert!(!p.flush_into(&mut second));
        assert!(!first.writes.is_empty());
        assert!(second.writes.is_empty());
    }

    #[test]
    fn emits_between_flushes_coalesce() {
        let mut p = pool(10);
        p.emit(1, || tagged(0.0)).unwrap();
        p.emit(2, || tagged(0.0)).unwrap();
        p.emit(3, || tagged(0.0)).unwrap();
        let mut sink = Recorder::default();
        p.flush_into(&mut sink);
        assert_eq!(sink.lifetime_slots(), vec![0..6]);
    }

    #[test]
    fn empty_emit_does_not_dirty() {
        let mut p = pool(4);
        p.emit(0, || tagged(0.0)).unwrap();
        assert!(!p.needs_update());
    }

    #[test]
    fn update_publishes_time_only() {
        let mut p = pool(4);
        p.emit(1, || tagged(2.0)).unwrap();
        p.shading_mut().intensity = 3.0;
        p.update(7.5);
        assert_eq!(p.uniforms().time, 7.5);
        assert_eq!(p.uniforms().intensity, 3.0);
        assert_eq!(lifetime_start(&p, 0), 2.0);
        assert_eq!(p.cursor(), 1);
    }

    #[test]
    fn billboard_pool_drops_pitch_and_yaw() {
        let settings = PoolSettings {
            render_mode: RenderMode::Billboard,
            ..PoolSettings::with_capacity(2)
        };
        let mut p = ParticlePool::new(settings).unwrap();
        p.emit(1, || ParticleRecord {
            rotation: Vec3::new(1.0, 1.0, 0.0),
            ..Default::default()
        })
        .unwrap();
        let m = p.instances().slot(InstanceAttribute::Matrix, 0);
        assert_eq!(&m[0..3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn dispose_is_idempotent_and_blocks_emit() {
        let mut p = pool(4);
        p.dispose();
        p.dispose();
        assert!(p.is_disposed());
        let err = p.emit(1, || tagged(0.0)).unwrap_err();
        assert!(matches!(err, VfxError::PreconditionViolation(_)));
        assert_eq!(p.cursor(), 0);
    }

    #[test]
    fn debug_output_summarizes_ring_state() {
        let mut p = pool(8);
        p.emit(3, || tagged(0.0)).unwrap();
        let text = format!("{p:?}");
        assert!(text.starts_with("ParticlePool"));
        assert!(text.contains("capacity: 8"));
        assert!(text.contains("cursor: 3"));
        assert!(text.contains("has_gpu: false"));
    }
}
