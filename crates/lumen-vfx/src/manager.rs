use std::cell::RefCell;
use std::rc::Rc;

use crate::emitter::Emitter;
use crate::error::{Result, VfxError};
use crate::gpu::{FrameUniforms, PoolResources, TargetFormats};
use crate::pool::{ParticlePool, PoolHandle};

/// Stable handle for an emitter registered with a [`VfxManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmitterId(u64);

/// Composition root for particle effects.
///
/// Owns named pools and the emitters feeding them, and drives them in a
/// fixed order each frame: pools publish the new time first, then emitters
/// enqueue particles against it. Pools are kept in registration order, which
/// is also the draw order.
#[derive(Default)]
pub struct VfxManager {
    pools: Vec<(String, PoolHandle)>,
    emitters: Vec<(EmitterId, Emitter)>,
    next_emitter_id: u64,
    disposed: bool,
}

impl VfxManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pool` under `name` and return the shared handle emitters
    /// bind to. An existing pool with the same name is replaced; emitters
    /// already bound to it keep feeding the old pool.
    pub fn add_pool(&mut self, name: impl Into<String>, pool: ParticlePool) -> Result<PoolHandle> {
        self.check_alive("add_pool")?;
        let handle = Rc::new(RefCell::new(pool));
        self.insert_pool(name.into(), Rc::clone(&handle));
        Ok(handle)
    }

    pub(crate) fn insert_pool(&mut self, name: String, handle: PoolHandle) {
        if let Some(slot) = self.pools.iter_mut().find(|(n, _)| *n == name) {
            log::warn!("Particle pool '{name}' replaced");
            slot.1 = handle;
        } else {
            log::info!("Particle pool '{name}' registered");
            self.pools.push((name, handle));
        }
    }

    pub fn pool(&self, name: &str) -> Option<&PoolHandle> {
        self.pools.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn pools(&self) -> impl Iterator<Item = (&str, &PoolHandle)> {
        self.pools.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn add_emitter(&mut self, emitter: Emitter) -> Result<EmitterId> {
        self.check_alive("add_emitter")?;
        let id = EmitterId(self.next_emitter_id);
        self.next_emitter_id += 1;
        self.emitters.push((id, emitter));
        Ok(id)
    }

    /// Detach an emitter. Unknown ids are ignored. The pool it fed is left
    /// as is; particles already emitted live out their lifetime.
    pub fn remove_emitter(&mut self, id: EmitterId) -> Option<Emitter> {
        let index = self.emitters.iter().position(|(i, _)| *i == id)?;
        Some(self.emitters.remove(index).1)
    }

    pub fn emitter(&self, id: EmitterId) -> Option<&Emitter> {
        self.emitters.iter().find(|(i, _)| *i == id).map(|(_, e)| e)
    }

    pub fn emitter_mut(&mut self, id: EmitterId) -> Option<&mut Emitter> {
        self.emitters
            .iter_mut()
            .find(|(i, _)| *i == id)
            .map(|(_, e)| e)
    }

    pub fn emitters(&self) -> impl Iterator<Item = (EmitterId, &Emitter)> {
        self.emitters.iter().map(|(i, e)| (*i, e))
    }

    pub fn emitters_mut(&mut self) -> impl Iterator<Item = (EmitterId, &mut Emitter)> {
        self.emitters.iter_mut().map(|(i, e)| (*i, e))
    }

    /// Advance one frame: every pool first, then every emitter. Every
    /// emitter is ticked even when another one fails; the first failure is
    /// returned once all have run.
    pub fn update(&mut self, delta: f32, elapsed: f32) -> Result<()> {
        self.check_alive("update")?;
        for (_, pool) in &self.pools {
            pool.borrow_mut().update(elapsed);
        }
        let mut first_error = None;
        for (id, emitter) in &mut self.emitters {
            if let Err(e) = emitter.update(delta, elapsed) {
                log::warn!("Emitter {id:?} failed to update: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Give every pool that has no GPU state yet its buffers and pipeline,
    /// with the default quad and no alpha mask.
    pub fn attach_gpu(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        targets: TargetFormats,
    ) -> Result<()> {
        self.check_alive("attach_gpu")?;
        for (name, pool) in &self.pools {
            let mut pool = pool.borrow_mut();
            if !pool.has_gpu() {
                log::debug!("Attaching GPU state to pool '{name}'");
                pool.attach_gpu(device, queue, targets, PoolResources::default())?;
            }
        }
        Ok(())
    }

    /// Flush every pool; returns how many uploaded instance data.
    pub fn prepare(&self, queue: &wgpu::Queue, frame: &FrameUniforms) -> Result<usize> {
        self.check_alive("prepare")?;
        let mut uploaded = 0;
        for (_, pool) in &self.pools {
            if pool.borrow_mut().prepare(queue, frame) {
                uploaded += 1;
            }
        }
        Ok(uploaded)
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (_, pool) in &self.pools {
            pool.borrow().draw(pass);
        }
    }

    /// Release every pool's GPU buffers and drop all pools and emitters.
    /// Anything but `dispose` afterwards is a precondition violation.
    pub fn dispose(&mut self) {
        if self.disposed {
            log::warn!("VfxManager already disposed");
            return;
        }
        for (_, pool) in &self.pools {
            pool.borrow_mut().dispose();
        }
        log::info!(
            "VfxManager disposed ({} pools, {} emitters)",
            self.pools.len(),
            self.emitters.len()
        );
        self.pools.clear();
        self.emitters.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn check_alive(&self, operation: &str) -> Result<()> {
        if self.disposed {
            return Err(VfxError::precondition(format!(
                "{operation} called on a disposed VfxManager"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use super::*;
    use crate::emitter::{EmitterSettings, SpawnMode};
    use crate::pool::PoolSettings;

    fn pool(capacity: u32) -> ParticlePool {
        ParticlePool::new(PoolSettings::with_capacity(capacity)).unwrap()
    }

    fn timed_emitter(pool: &PoolHandle, count: u32) -> Emitter {
        let settings = EmitterSettings {
            count,
            duration: 1.0,
            ..Default::default()
        };
        Emitter::new(Rc::clone(pool), settings)
            .unwrap()
            .with_rng(Pcg32::seed_from_u64(11))
    }

    #[test]
    fn pools_are_looked_up_by_name() {
        let mut m = VfxManager::new();
        let sparks = m.add_pool("sparks", pool(10)).unwrap();
        assert!(Rc::ptr_eq(m.pool("sparks").unwrap(), &sparks));
        assert!(m.pool("smoke").is_none());
    }

    #[test]
    fn name_collision_overwrites() {
        let mut m = VfxManager::new();
        m.add_pool("a", pool(10)).unwrap();
        m.add_pool("b", pool(10)).unwrap();
        let replacement = m.add_pool("a", pool(20)).unwrap();
        assert_eq!(m.pools().count(), 2);
        assert!(Rc::ptr_eq(m.pool("a").unwrap(), &replacement));
        assert_eq!(m.pool("a").unwrap().borrow().capacity(), 20);
        // Replacement keeps its draw position.
        let names: Vec<_> = m.pools().map(|(n, _)| n.to_owned()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn update_refreshes_pools_then_ticks_emitters() {
        let mut m = VfxManager::new();
        let handle = m.add_pool("p", pool(1000)).unwrap();
        m.add_emitter(timed_emitter(&handle, 100)).unwrap();

        m.update(0.5, 0.5).unwrap();
        m.update(0.5, 1.0).unwrap();
        let p = handle.borrow();
        assert_eq!(p.uniforms().time, 1.0);
        assert_eq!(p.cursor(), 50);
        // Emitted during the same update that published time 1.0.
        assert_eq!(p.instances().slot(crate::pool::InstanceAttribute::Lifetime, 0)[0], 1.0);
    }

    #[test]
    fn several_emitters_share_one_pool() {
        let mut m = VfxManager::new();
        let handle = m.add_pool("p", pool(1000)).unwrap();
        m.add_emitter(timed_emitter(&handle, 10)).unwrap();
        m.add_emitter(timed_emitter(&handle, 20)).unwrap();
        m.update(1.0, 0.0).unwrap();
        m.update(0.0, 1.0).unwrap();
        assert_eq!(handle.borrow().cursor(), 30);
    }

    #[test]
    fn remove_emitter_keeps_pool() {
        let mut m = VfxManager::new();
        let handle = m.add_pool("p", pool(100)).unwrap();
        let id = m.add_emitter(timed_emitter(&handle, 10)).unwrap();
        let removed = m.remove_emitter(id).unwrap();
        assert_eq!(removed.settings().count, 10);
        assert!(m.emitter(id).is_none());
        assert!(m.remove_emitter(id).is_none());
        assert!(m.pool("p").is_some());

        m.update(2.0, 0.0).unwrap();
        m.update(0.0, 2.0).unwrap();
        assert_eq!(handle.borrow().cursor(), 0);
    }

    #[test]
    fn emitter_ids_are_not_reused() {
        let mut m = VfxManager::new();
        let handle = m.add_pool("p", pool(100)).unwrap();
        let first = m.add_emitter(timed_emitter(&handle, 1)).unwrap();
        m.remove_emitter(first);
        let second = m.add_emitter(timed_emitter(&handle, 1)).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn emitter_mut_reaches_registered_emitter() {
        let mut m = VfxManager::new();
        let handle = m.add_pool("p", pool(100)).unwrap();
        let settings = EmitterSettings {
            count: 5,
            spawn_mode: SpawnMode::Burst,
            ..Default::default()
        };
        let id = m
            .add_emitter(Emitter::new(Rc::clone(&handle), settings).unwrap())
            .unwrap();
        m.emitter_mut(id).unwrap().emit_at(None, true).unwrap();
        assert_eq!(handle.borrow().cursor(), 5);
    }

    #[test]
    fn burst_after_update_is_stamped_with_frame_time() {
        let mut m = VfxManager::new();
        let handle = m.add_pool("p", pool(100)).unwrap();
        let settings = EmitterSettings {
            count: 3,
            spawn_mode: SpawnMode::Burst,
            ..Default::default()
        };
        let id = m
            .add_emitter(Emitter::new(Rc::clone(&handle), settings).unwrap())
            .unwrap();

        m.update(0.016, 0.5).unwrap();
        m.update(0.016, 0.516).unwrap();
        m.emitter_mut(id).unwrap().emit_at(None, true).unwrap();

        let p = handle.borrow();
        assert_eq!(p.uniforms().time, 0.516);
        for slot in 0..3 {
            assert_eq!(p.instances().slot(crate::pool::InstanceAttribute::Lifetime, slot)[0], 0.516);
        }
    }

    #[test]
    fn dispose_releases_pools_once_and_empties() {
        let mut m = VfxManager::new();
        let handle = m.add_pool("p", pool(10)).unwrap();
        m.add_emitter(timed_emitter(&handle, 5)).unwrap();

        m.dispose();
        assert!(handle.borrow().is_disposed());
        assert_eq!(m.pools().count(), 0);
        assert_eq!(m.emitters().count(), 0);

        m.dispose();
        assert!(m.is_disposed());
    }

    #[test]
    fn operations_after_dispose_are_rejected() {
        let mut m = VfxManager::new();
        m.dispose();
        assert!(matches!(
            m.update(0.016, 0.016),
            Err(VfxError::PreconditionViolation(_))
        ));
        assert!(matches!(
            m.add_pool("p", pool(4)),
            Err(VfxError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn failing_emitter_does_not_stall_others() {
        let mut m = VfxManager::new();
        let dead = m.add_pool("dead", pool(10)).unwrap();
        let live = m.add_pool("live", pool(100)).unwrap();
        m.add_emitter(timed_emitter(&dead, 5)).unwrap();
        let healthy = m.add_emitter(timed_emitter(&live, 10)).unwrap();
        dead.borrow_mut().dispose();

        m.update(1.0, 0.0).unwrap();
        let err = m.update(0.0, 1.0).unwrap_err();
        assert!(matches!(err, VfxError::PreconditionViolation(_)));
        assert_eq!(live.borrow().cursor(), 10);
        assert_eq!(m.emitter(healthy).unwrap().emitted(), 10);
        assert_eq!(m.emitter(healthy).unwrap().elapsed_time(), 1.0);
    }

    #[test]
    fn detached_emitter_on_disposed_pool_fails() {
        let mut m = VfxManager::new();
        let handle = m.add_pool("p", pool(10)).unwrap();
        let mut emitter = timed_emitter(&handle, 5);
        m.dispose();
        emitter.update(1.0, 0.0).unwrap();
        assert!(emitter.update(0.0, 1.0).is_err());
    }
}
