//! JSON effect files: named pools plus the emitters that feed them.

pub mod format;
pub mod loader;

pub use format::{EffectDef, EmitterDef, PoolDef};
pub use loader::LoadedEffect;
