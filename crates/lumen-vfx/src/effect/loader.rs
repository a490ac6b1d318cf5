use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use glam::{EulerRot, Quat, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::format::{EffectDef, EmitterDef};
use crate::emitter::Emitter;
use crate::error::{Result, VfxError};
use crate::manager::{EmitterId, VfxManager};
use crate::pool::{ParticlePool, PoolHandle};

impl EffectDef {
    /// Read and parse an effect file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| VfxError::AssetLoad(format!("{}: {e}", path.display())))?;
        let effect = Self::from_json(&json)?;
        log::info!(
            "Loaded effect '{}' ({} pools, {} emitters) from {}",
            effect.name,
            effect.pools.len(),
            effect.emitters.len(),
            path.display()
        );
        Ok(effect)
    }
}

/// What an effect added to a manager.
#[derive(Debug, Default)]
pub struct LoadedEffect {
    pub pools: Vec<PoolHandle>,
    pub emitters: Vec<EmitterId>,
}

impl VfxManager {
    /// Build every pool and emitter of `effect` and register them. Emitters
    /// are bound to pools by name here, once; a name not declared by the
    /// effect resolves against pools already in the manager. Nothing is
    /// registered unless the whole effect is valid.
    pub fn load_effect(&mut self, effect: &EffectDef) -> Result<LoadedEffect> {
        self.check_alive("load_effect")?;
        let known: Vec<&str> = self.pools().map(|(name, _)| name).collect();
        effect.validate(&known)?;

        let mut pools = Vec::with_capacity(effect.pools.len());
        for def in &effect.pools {
            let pool = ParticlePool::new(def.settings.clone())
                .map_err(|e| VfxError::invalid(format!("pool '{}': {e}", def.name)))?;
            pools.push((def.name.clone(), Rc::new(RefCell::new(pool))));
        }

        let mut emitters = Vec::with_capacity(effect.emitters.len());
        for def in &effect.emitters {
            let pool = pools
                .iter()
                .find(|(name, _)| *name == def.pool)
                .map(|(_, handle)| handle)
                .or_else(|| self.pool(&def.pool))
                .ok_or_else(|| VfxError::invalid(format!("unknown pool '{}'", def.pool)))?;
            emitters.push(build_emitter(Rc::clone(pool), def)?);
        }

        let mut loaded = LoadedEffect::default();
        for (name, handle) in pools {
            loaded.pools.push(Rc::clone(&handle));
            self.insert_pool(name, handle);
        }
        for emitter in emitters {
            loaded.emitters.push(self.add_emitter(emitter)?);
        }
        log::info!(
            "Effect '{}' instantiated: {} pools, {} emitters",
            effect.name,
            loaded.pools.len(),
            loaded.emitters.len()
        );
        Ok(loaded)
    }

    pub fn load_effect_file(&mut self, path: &Path) -> Result<LoadedEffect> {
        let effect = EffectDef::load(path)?;
        self.load_effect(&effect)
    }
}

fn build_emitter(pool: PoolHandle, def: &EmitterDef) -> Result<Emitter> {
    let mut emitter = Emitter::new(pool, def.settings.clone())?;
    if let Some(seed) = def.seed {
        emitter = emitter.with_rng(Pcg32::seed_from_u64(seed));
    }
    let node = emitter.node_mut();
    node.position = Vec3::from_array(def.position);
    let [x, y, z] = def.rotation;
    node.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
    if !def.autostart {
        emitter.stop_emitting();
    }
    Ok(emitter)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::pool::PoolSettings;

    const CAMPFIRE: &str = r#"{
        "name": "campfire",
        "pools": [
            { "name": "embers", "settings": { "capacity": 64 } },
            { "name": "smoke", "settings": { "capacity": 32 } }
        ],
        "emitters": [
            { "pool": "embers", "position": [1, 2, 3], "seed": 1, "settings": { "count": 20 } },
            { "pool": "smoke", "autostart": false, "settings": { "count": 5 } }
        ]
    }"#;

    fn write_effect(dir: &tempfile::TempDir, json: &str) -> std::path::PathBuf {
        let path = dir.path().join("campfire.vfx.json");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn loads_effect_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_effect(&dir, CAMPFIRE);

        let mut m = VfxManager::new();
        let loaded = m.load_effect_file(&path).unwrap();
        assert_eq!(loaded.pools.len(), 2);
        assert_eq!(loaded.emitters.len(), 2);
        assert_eq!(m.pool("embers").unwrap().borrow().capacity(), 64);
        assert_eq!(m.pool("smoke").unwrap().borrow().capacity(), 32);

        let embers = m.emitter(loaded.emitters[0]).unwrap();
        assert_eq!(embers.node().position, Vec3::new(1.0, 2.0, 3.0));
        assert!(embers.is_emitting());
        assert!(Rc::ptr_eq(embers.pool(), m.pool("embers").unwrap()));
        assert!(!m.emitter(loaded.emitters[1]).unwrap().is_emitting());
    }

    #[test]
    fn loaded_effect_runs() {
        let mut m = VfxManager::new();
        let effect = EffectDef::from_json(CAMPFIRE).unwrap();
        m.load_effect(&effect).unwrap();
        m.update(1.0, 0.0).unwrap();
        m.update(0.0, 1.0).unwrap();
        assert_eq!(m.pool("embers").unwrap().borrow().cursor(), 20);
        assert_eq!(m.pool("smoke").unwrap().borrow().cursor(), 0);
    }

    #[test]
    fn missing_file_is_asset_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EffectDef::load(&dir.path().join("nope.vfx.json")).unwrap_err();
        assert!(matches!(err, VfxError::AssetLoad(_)));
    }

    #[test]
    fn invalid_effect_registers_nothing() {
        let json = r#"{
            "pools": [ { "name": "good" }, { "name": "bad", "settings": { "capacity": 0 } } ],
            "emitters": [ { "pool": "good" } ]
        }"#;
        let mut m = VfxManager::new();
        let err = m.load_effect(&EffectDef::from_json(json).unwrap()).unwrap_err();
        assert!(matches!(err, VfxError::InvalidConfig(ref msg) if msg.contains("bad")));
        assert_eq!(m.pools().count(), 0);
        assert_eq!(m.emitters().count(), 0);
    }

    #[test]
    fn bad_palette_registers_nothing() {
        let json = r#"{
            "pools": [ { "name": "p" } ],
            "emitters": [ { "pool": "p", "settings": { "color_start": ["chartreuse", "nope"] } } ]
        }"#;
        let mut m = VfxManager::new();
        let err = m.load_effect(&EffectDef::from_json(json).unwrap()).unwrap_err();
        assert!(matches!(err, VfxError::UnknownColor(_)));
        assert!(m.pool("p").is_none());
    }

    #[test]
    fn emitters_can_feed_existing_pools() {
        let mut m = VfxManager::new();
        let shared = m
            .add_pool("shared", ParticlePool::new(PoolSettings::with_capacity(16)).unwrap())
            .unwrap();
        let json = r#"{ "emitters": [ { "pool": "shared", "settings": { "count": 4, "spawn_mode": "burst" } } ] }"#;
        let loaded = m.load_effect(&EffectDef::from_json(json).unwrap()).unwrap();
        assert!(loaded.pools.is_empty());

        m.emitter_mut(loaded.emitters[0])
            .unwrap()
            .emit_at(None, false)
            .unwrap();
        assert_eq!(shared.borrow().cursor(), 4);
    }

    #[test]
    fn shipped_fountain_effect_is_valid() {
        let json = include_str!("../../../../assets/effects/fountain.vfx.json");
        let mut m = VfxManager::new();
        let loaded = m.load_effect(&EffectDef::from_json(json).unwrap()).unwrap();
        assert_eq!(loaded.pools.len(), 2);
        assert_eq!(loaded.emitters.len(), 2);
        assert_eq!(m.pool("droplets").unwrap().borrow().capacity(), 30000);
    }

    #[test]
    fn loading_into_disposed_manager_fails() {
        let mut m = VfxManager::new();
        m.dispose();
        let effect = EffectDef::from_json(CAMPFIRE).unwrap();
        assert!(matches!(
            m.load_effect(&effect),
            Err(VfxError::PreconditionViolation(_))
        ));
    }
}
