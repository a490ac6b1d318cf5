//! Particle emitters.
//!
//! An emitter is a scene node bound to one pool. It either spreads `count`
//! particles evenly over `duration` seconds (time mode) or releases them all
//! at once on demand (burst mode). Every particle is synthesized on the CPU
//! from the emitter's randomized settings and handed to the pool's ring.

pub mod settings;
mod synth;

use std::rc::Rc;

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::color::{Rgb, parse_palette};
use crate::error::{Result, VfxError};
use crate::pool::PoolHandle;
use crate::transform::{SceneNode, WorldPose};
pub use settings::{EmitterSettings, SpawnMode};
pub use synth::ParticleSynth;

pub struct Emitter {
    node: SceneNode,
    settings: EmitterSettings,
    color_start: Vec<Rgb>,
    color_end: Vec<Rgb>,
    pool: PoolHandle,
    rng: Pcg32,
    emitted: u32,
    elapsed_time: f32,
    current_time: f32,
    should_emit: bool,
}

impl Emitter {
    /// Bind a new emitter to `pool`. Settings are validated and colour
    /// palettes resolved up front; the emitter starts in the emitting state.
    pub fn new(pool: PoolHandle, settings: EmitterSettings) -> Result<Self> {
        let (color_start, color_end) = resolve_palettes(&settings)?;
        log::debug!(
            "Emitter created: {:?} mode, {} particles over {}s",
            settings.spawn_mode,
            settings.count,
            settings.duration
        );
        Ok(Self {
            node: SceneNode::default(),
            settings,
            color_start,
            color_end,
            pool,
            rng: Pcg32::from_entropy(),
            emitted: 0,
            elapsed_time: 0.0,
            current_time: 0.0,
            should_emit: true,
        })
    }

    /// Replace the random source, e.g. with a seeded generator for
    /// reproducible effects.
    #[must_use]
    pub fn with_rng(mut self, rng: Pcg32) -> Self {
        self.rng = rng;
        self
    }

    pub fn settings(&self) -> &EmitterSettings {
        &self.settings
    }

    /// Swap in new settings. Counters and pose are kept, so a running cycle
    /// continues under the new rate. On error the old settings stay active.
    pub fn update_settings(&mut self, settings: EmitterSettings) -> Result<()> {
        let (color_start, color_end) = resolve_palettes(&settings)?;
        self.settings = settings;
        self.color_start = color_start;
        self.color_end = color_end;
        Ok(())
    }

    pub fn node(&self) -> &SceneNode {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut SceneNode {
        &mut self.node
    }

    pub fn pool(&self) -> &PoolHandle {
        &self.pool
    }

    /// Particles emitted by the time schedule in the current cycle.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }

    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    pub fn is_emitting(&self) -> bool {
        self.should_emit
    }

    pub fn start_emitting(&mut self, reset: bool) {
        self.should_emit = true;
        if reset {
            self.emitted = 0;
            self.elapsed_time = 0.0;
        }
    }

    pub fn stop_emitting(&mut self) {
        self.should_emit = false;
    }

    /// Advance by `delta` seconds. `elapsed` is the absolute simulation time
    /// and becomes the birth time of anything emitted here or by the next
    /// burst. A stopped emitter neither emits nor advances its clock.
    pub fn update(&mut self, delta: f32, elapsed: f32) -> Result<()> {
        self.current_time = elapsed;
        if !self.should_emit {
            return Ok(());
        }
        if self.settings.spawn_mode == SpawnMode::Time {
            self.emit_on_schedule()?;
        }
        self.elapsed_time += delta;
        Ok(())
    }

    /// Release the rest of the cycle (`count - emitted` particles) in one
    /// batch. With `position`, the emitter is moved there first; `reset`
    /// clears the cycle counters after the batch size is taken.
    pub fn emit_at(&mut self, position: Option<Vec3>, reset: bool) -> Result<()> {
        if self.settings.spawn_mode != SpawnMode::Burst {
            return Err(VfxError::precondition(format!(
                "emit_at requires burst spawn mode, emitter is in {:?} mode",
                self.settings.spawn_mode
            )));
        }

        let batch = self.settings.count.saturating_sub(self.emitted);
        if reset {
            self.emitted = 0;
            self.elapsed_time = 0.0;
        }
        if let Some(position) = position {
            self.node.position = position;
        }
        let pose = self.node.world_pose();
        self.emit_batch(batch, pose)
    }

    /// Time mode: catch the cumulative emission count up with the schedule.
    fn emit_on_schedule(&mut self) -> Result<()> {
        let count = self.settings.count;
        let looping = self.settings.looping;
        if !looping && self.emitted >= count {
            return Ok(());
        }
        let since_start = self.elapsed_time - self.settings.delay;
        if since_start < 0.0 {
            return Ok(());
        }

        let progress = f64::from(since_start) / f64::from(self.settings.duration);
        let mut target = (progress * f64::from(count)).floor().max(0.0);
        if !looping {
            target = target.min(f64::from(count));
        }
        let target = target as u32;
        if target > self.emitted {
            let batch = target - self.emitted;
            let pose = self.node.world_pose();
            self.emit_batch(batch, pose)?;
            self.emitted = target;
        }
        if looping {
            self.roll_over_cycles();
        }
        Ok(())
    }

    /// Drop completed loop cycles from both counters, keeping the remainder.
    fn roll_over_cycles(&mut self) {
        let cycles = self.emitted.checked_div(self.settings.count).unwrap_or(0);
        if cycles == 0 {
            return;
        }
        self.emitted -= cycles * self.settings.count;
        let rewind = f64::from(cycles) * f64::from(self.settings.duration);
        self.elapsed_time = (f64::from(self.elapsed_time) - rewind) as f32;
    }

    fn emit_batch(&mut self, batch: u32, pose: WorldPose) -> Result<()> {
        if batch == 0 {
            return Ok(());
        }
        let synth = ParticleSynth {
            settings: &self.settings,
            color_start: &self.color_start,
            color_end: &self.color_end,
            pose,
            birth_time: self.current_time,
        };
        let rng = &mut self.rng;
        let pool = Rc::clone(&self.pool);
        let mut pool = pool.borrow_mut();
        pool.emit(batch as usize, || synth.sample(&mut *rng))
    }
}

fn resolve_palettes(settings: &EmitterSettings) -> Result<(Vec<Rgb>, Vec<Rgb>)> {
    settings.validate()?;
    Ok((
        parse_palette(&settings.color_start)?,
        parse_palette(&settings.color_end)?,
    ))
}
