//! GPU-instanced particle effects.
//!
//! A [`ParticlePool`] owns a fixed ring of per-instance attributes drawn in a
//! single instanced call; [`Emitter`]s synthesize particles into pools; the
//! [`VfxManager`] ties them together and drives the frame:
//!
//! ```text
//! manager.update(dt, elapsed)   // pools publish time, then emitters emit
//! manager.prepare(queue, frame) // upload dirty instance ranges
//! manager.draw(&mut pass)       // one instanced draw per pool
//! ```
//!
//! Particle motion is extrapolated on the GPU from each particle's birth
//! time, so the CPU only ever writes a particle once.

pub mod color;
pub mod easing;
pub mod effect;
pub mod emitter;
pub mod error;
pub mod gpu;
pub mod manager;
pub mod pool;
pub mod transform;

pub use effect::{EffectDef, LoadedEffect};
pub use emitter::{Emitter, EmitterSettings, SpawnMode};
pub use error::{Result, VfxError};
pub use manager::{EmitterId, VfxManager};
pub use pool::{ParticlePool, PoolHandle, PoolSettings};
pub use transform::SceneNode;
