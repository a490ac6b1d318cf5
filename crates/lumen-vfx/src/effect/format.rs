use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::emitter::EmitterSettings;
use crate::error::{Result, VfxError};
use crate::pool::PoolSettings;

/// A named pool declared by an effect file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolDef {
    pub name: String,
    #[serde(default)]
    pub settings: PoolSettings,
}

/// An emitter declared by an effect file, bound to a pool by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterDef {
    pub pool: String,
    #[serde(default)]
    pub position: [f32; 3],
    /// XYZ Euler angles in radians.
    #[serde(default)]
    pub rotation: [f32; 3],
    /// Start emitting as soon as the effect is loaded.
    #[serde(default = "default_true")]
    pub autostart: bool,
    /// Fixed RNG seed for reproducible playback.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub settings: EmitterSettings,
}

fn default_true() -> bool {
    true
}

/// A `.vfx.json` effect definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectDef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pools: Vec<PoolDef>,
    #[serde(default)]
    pub emitters: Vec<EmitterDef>,
}

impl EffectDef {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| VfxError::AssetLoad(format!("effect JSON: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| VfxError::AssetLoad(format!("effect JSON: {e}")))
    }

    /// Structural checks that need no pool or emitter construction: pool
    /// names are unique within the file and every emitter names a pool.
    /// `known_pools` lists pools that exist outside the file.
    pub fn validate(&self, known_pools: &[&str]) -> Result<()> {
        let mut names = HashSet::new();
        for pool in &self.pools {
            if pool.name.is_empty() {
                return Err(VfxError::invalid("effect pool with an empty name"));
            }
            if !names.insert(pool.name.as_str()) {
                return Err(VfxError::invalid(format!(
                    "effect declares pool '{}' twice",
                    pool.name
                )));
            }
        }
        for emitter in &self.emitters {
            let name = emitter.pool.as_str();
            if !names.contains(name) && !known_pools.contains(&name) {
                return Err(VfxError::invalid(format!(
                    "emitter references unknown pool '{name}'"
                )));
            }
        }
        Ok(())
    }
}
